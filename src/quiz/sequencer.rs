use std::collections::HashSet;

use crate::quiz::{Question, QuestionId, Quiz};

/// First question of `quiz`, in quiz order, that is not in `answered`.
/// `None` means the quiz is exhausted.
pub fn next_question<'a>(quiz: &'a Quiz, answered: &HashSet<QuestionId>) -> Option<&'a Question> {
    quiz.questions.iter().find(|q| !answered.contains(&q.id))
}

/// 1-based position of `question` within the quiz, for "Question n of N" headers.
pub fn position(quiz: &Quiz, question: &Question) -> (usize, usize) {
    let index = quiz
        .questions
        .iter()
        .position(|q| q.id == question.id)
        .unwrap_or(0);
    (index + 1, quiz.questions.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::QuestionKind;

    fn quiz_with(ids: &[QuestionId]) -> Quiz {
        Quiz {
            id: 1,
            title: "Quiz".into(),
            description: None,
            created_at: None,
            is_active: true,
            questions: ids
                .iter()
                .map(|&id| Question {
                    id,
                    text: format!("Question {id}"),
                    kind: QuestionKind::Text,
                })
                .collect(),
        }
    }

    #[test]
    fn returns_first_question_when_nothing_answered() {
        let quiz = quiz_with(&[3, 1, 2]);
        assert_eq!(next_question(&quiz, &HashSet::new()).map(|q| q.id), Some(3));
    }

    #[test]
    fn follows_quiz_order_not_id_order() {
        let quiz = quiz_with(&[3, 1, 2]);
        let answered = HashSet::from([3]);
        assert_eq!(next_question(&quiz, &answered).map(|q| q.id), Some(1));
    }

    #[test]
    fn skips_answered_questions_out_of_order() {
        let quiz = quiz_with(&[10, 11, 12]);
        let answered = HashSet::from([11]);
        assert_eq!(next_question(&quiz, &answered).map(|q| q.id), Some(10));
    }

    #[test]
    fn none_when_everything_answered() {
        let quiz = quiz_with(&[10, 11]);
        let answered = HashSet::from([10, 11, 99]);
        assert!(next_question(&quiz, &answered).is_none());
        assert!(next_question(&quiz_with(&[]), &HashSet::new()).is_none());
    }

    #[test]
    fn repeated_calls_agree() {
        let quiz = quiz_with(&[10, 11, 12]);
        let answered = HashSet::from([10]);
        let first = next_question(&quiz, &answered).map(|q| q.id);
        let second = next_question(&quiz, &answered).map(|q| q.id);
        assert_eq!(first, second);
    }

    #[test]
    fn walks_every_question_exactly_once() {
        let quiz = quiz_with(&[5, 4, 9, 1]);
        let mut answered = HashSet::new();
        let mut seen = Vec::new();
        while let Some(q) = next_question(&quiz, &answered) {
            assert!(answered.insert(q.id), "question {} asked twice", q.id);
            seen.push(q.id);
        }
        assert_eq!(seen, vec![5, 4, 9, 1]);
    }

    #[test]
    fn reports_position() {
        let quiz = quiz_with(&[10, 11, 12]);
        assert_eq!(position(&quiz, &quiz.questions[1]), (2, 3));
    }
}
