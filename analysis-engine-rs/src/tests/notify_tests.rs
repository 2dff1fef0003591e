//! Tests for the broadcast notifier's channel lifecycle

use tokio::sync::broadcast::error::TryRecvError;

use backend_sdk::BackendIdentity;

use crate::job::{JobId, TaskStatus};
use crate::notify::{ChannelNotifier, Notifier, PushEvent};

fn progress_event(job_id: JobId, user_id: &str) -> PushEvent {
    PushEvent::ModelProgress {
        job_id,
        user_id: user_id.to_string(),
        backend: BackendIdentity::OpenAi,
        progress: 10,
        status: TaskStatus::Processing,
        overall_progress: 10,
    }
}

#[test]
fn job_subscribers_only_see_their_own_job() {
    let notifier = ChannelNotifier::new(8);
    let watched = JobId::new();
    let other = JobId::new();
    let mut events = notifier.subscribe_job(watched);

    notifier.publish(&progress_event(other, "teacher-7"));
    notifier.publish(&progress_event(watched, "teacher-7"));

    match events.try_recv() {
        Ok(event) => assert_eq!(event.job_id(), watched),
        Err(err) => panic!("expected a delivered event, got {err}"),
    }
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn released_job_channels_close_and_later_publishes_are_dropped() {
    let notifier = ChannelNotifier::new(8);
    let job_id = JobId::new();
    let mut events = notifier.subscribe_job(job_id);

    notifier.publish(&progress_event(job_id, "teacher-7"));
    assert!(events.try_recv().is_ok());

    notifier.release_job(job_id);
    // The sender went away with the channel entry
    assert!(matches!(events.try_recv(), Err(TryRecvError::Closed)));
    // Publishing to the released job must stay a silent no-op
    notifier.publish(&progress_event(job_id, "teacher-7"));
}

#[test]
fn user_and_job_scopes_deliver_independently() {
    let notifier = ChannelNotifier::new(8);
    let job_id = JobId::new();
    let mut job_events = notifier.subscribe_job(job_id);
    let mut user_events = notifier.subscribe_user("teacher-7");

    notifier.publish(&progress_event(job_id, "teacher-7"));

    assert!(job_events.try_recv().is_ok());
    assert!(user_events.try_recv().is_ok());
}
