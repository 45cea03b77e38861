use std::sync::Arc;

use async_trait::async_trait;

use rehearse_core::model::{Answer, InterviewMeta, UserId};
use rehearse_core::time::fixed_clock;
use services::{AppServices, Evaluator, EvaluatorError, GenerationRequest, TimeWindow};

struct CoachBot;

#[async_trait]
impl Evaluator for CoachBot {
    async fn evaluate(&self, _question: &str, answer: &str) -> Result<String, EvaluatorError> {
        let score = if answer.len() > 20 { 9 } else { 6 };
        Ok(format!("Concrete and calm.\n\nScore: {score}"))
    }

    async fn ideal_answer(&self, question: &str) -> Result<String, EvaluatorError> {
        Ok(format!(
            "A strong answer to \"{question}\" leads with one example."
        ))
    }

    async fn generate_questions(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<String>, EvaluatorError> {
        Ok(vec![
            format!("Why {}?", request.profile),
            "Walk me through a project you are proud of.".to_string(),
            "Where do you want to grow next?".to_string(),
        ])
    }
}

#[tokio::test]
async fn interview_round_trip_feeds_analytics() {
    let services = AppServices::in_memory(fixed_clock(), Arc::new(CoachBot));
    let interviews = services.interviews();
    let user = UserId::new("u-42");
    let meta = InterviewMeta::new(
        Some("Technical".to_string()),
        Some("Backend".to_string()),
        None,
    );

    let mut engine = interviews
        .start(
            user.clone(),
            meta.clone(),
            &GenerationRequest::new("Backend Engineer", "Senior"),
        )
        .await
        .unwrap();
    assert_eq!(engine.progress().total, 3);

    let first = engine
        .submit_answer(Answer::Provided(
            "I rebuilt our flaky deploy pipeline end to end.".to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(first.score, Some(9));
    assert!(!first.is_complete);

    let skipped = engine.submit_answer(Answer::Skipped).await.unwrap();
    assert_eq!(skipped.score, None);
    assert!(skipped.feedback.contains("strong answer"));

    let last = engine
        .submit_answer(Answer::Provided("Mentoring.".to_string()))
        .await
        .unwrap();
    assert!(last.is_complete);
    assert!(last.session_id.is_some());

    // the finished session is gone from the cache...
    assert!(
        interviews
            .resume(user.clone(), meta)
            .await
            .unwrap()
            .is_none()
    );

    // ...and visible to analytics
    let analytics = services.analytics();
    let distribution = analytics.distribution(&user).await.unwrap();
    assert_eq!(distribution.len(), 1);
    assert_eq!(distribution[0].label, "Technical / Backend");
    assert!((distribution[0].value - 7.5).abs() < f64::EPSILON);

    let series = analytics
        .performance(&user, TimeWindow::Today)
        .await
        .unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].label, "12:00");
}

#[tokio::test]
async fn interrupted_interview_resumes_where_it_left_off() {
    let services = AppServices::in_memory(fixed_clock(), Arc::new(CoachBot));
    let interviews = services.interviews();
    let user = UserId::new("u-42");
    let meta = InterviewMeta::default();

    let mut engine = interviews
        .start(
            user.clone(),
            meta.clone(),
            &GenerationRequest::new("Backend Engineer", "Senior"),
        )
        .await
        .unwrap();
    engine
        .submit_answer(Answer::Provided("First answer.".to_string()))
        .await
        .unwrap();
    drop(engine);

    let mut resumed = interviews
        .resume(user.clone(), meta)
        .await
        .unwrap()
        .expect("in-flight session");
    assert_eq!(resumed.current_index(), 1);
    assert_eq!(resumed.progress().answered, 1);

    resumed.submit_answer(Answer::Skipped).await.unwrap();
    let last = resumed
        .submit_answer(Answer::Provided("Closing thoughts.".to_string()))
        .await
        .unwrap();
    assert!(last.is_complete);
}
