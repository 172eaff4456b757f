//! End-to-end review lifecycle through the public engine API

use async_trait::async_trait;
use review_stitcher::domain::{
    epoch_secs, DetectionState, FrigateEvent, MessageKind, Profile, ReviewMessage,
};
use review_stitcher::io::{PublishError, ReviewPublisher};
use review_stitcher::services::{create_ingest_channel, Engine};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default, Clone)]
struct SharedRecorder {
    messages: Arc<Mutex<Vec<ReviewMessage>>>,
}

impl SharedRecorder {
    fn kinds(&self) -> Vec<MessageKind> {
        self.messages.lock().iter().map(|m| m.kind).collect()
    }
}

#[async_trait]
impl ReviewPublisher for SharedRecorder {
    async fn publish(&self, _topic: &str, message: &ReviewMessage) -> Result<(), PublishError> {
        self.messages.lock().push(message.clone());
        Ok(())
    }
}

fn person_on_cam1() -> Profile {
    Profile {
        name: "p".to_string(),
        cameras: vec!["cam1".to_string()],
        labels: vec!["person".to_string()],
        required_zones: Vec::new(),
        gap: 1,
    }
}

fn detection(end_time: f64) -> FrigateEvent {
    FrigateEvent::update(DetectionState {
        id: "e1".to_string(),
        camera: "cam1".to_string(),
        label: "person".to_string(),
        start_time: 1000.0,
        end_time,
        ..Default::default()
    })
}

#[tokio::test]
async fn test_new_update_end_scenario() {
    let recorder = SharedRecorder::default();
    let mut engine = Engine::new(vec![person_on_cam1()], recorder.clone(), "reviews");

    engine.handle_event_at(detection(0.0), 1000.0).await;
    assert_eq!(recorder.kinds(), vec![MessageKind::New]);

    engine.handle_event_at(detection(1000.0), 1000.5).await;
    assert_eq!(recorder.kinds(), vec![MessageKind::New, MessageKind::Update]);
    {
        let messages = recorder.messages.lock();
        assert_eq!(messages[1].after.as_ref().unwrap().active_events, 0);
        assert!(messages[1].before.is_some());
    }

    // Elapsed == gap does not close
    engine.tick_at(1001.0).await;
    assert!(engine.review("p").is_some());

    engine.tick_at(1001.1).await;
    assert_eq!(recorder.kinds(), vec![MessageKind::New, MessageKind::Update, MessageKind::End]);
    assert!(engine.review("p").is_none());
}

#[tokio::test]
async fn test_run_loop_closes_review_on_wall_clock() {
    let recorder = SharedRecorder::default();
    let mut engine = Engine::new(vec![person_on_cam1()], recorder.clone(), "reviews");
    let (tx, rx) = create_ingest_channel();

    // Detection that started and ended two seconds ago, gap of one second
    let now = epoch_secs();
    let mut event = detection(now - 2.0);
    event.after.start_time = now - 3.0;

    let producer = tokio::spawn(async move {
        tx.send(event).await.unwrap();
        // Keep the queue open across a couple of ticks
        tokio::time::sleep(Duration::from_millis(2500)).await;
    });

    engine.run(rx).await;
    producer.await.unwrap();

    assert_eq!(recorder.kinds(), vec![MessageKind::New, MessageKind::End]);
    assert_eq!(engine.open_reviews(), 0);
}

#[tokio::test]
async fn test_recorder_shared_across_tasks() {
    let recorder = SharedRecorder::default();
    let mut engine = Engine::new(vec![person_on_cam1()], recorder.clone(), "reviews");
    let (tx, rx) = create_ingest_channel();

    let engine_task = tokio::spawn(async move {
        engine.run(rx).await;
        engine
    });

    tx.send(detection(0.0)).await.unwrap();
    drop(tx);
    let engine = engine_task.await.unwrap();

    // Observed from this task after the engine task published
    assert_eq!(recorder.kinds(), vec![MessageKind::New]);
    assert_eq!(recorder.messages.lock().len(), 1);
    assert_eq!(engine.open_reviews(), 1);
}
