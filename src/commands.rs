use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "basic information")]
    Start,
    #[command(description = "show this text")]
    Help,
    #[command(description = "start a quiz")]
    StartQuiz,
    #[command(description = "cancel the current quiz")]
    Cancel,
}

pub fn help_text() -> String {
    Command::descriptions().to_string()
}
