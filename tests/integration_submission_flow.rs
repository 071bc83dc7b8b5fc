use std::sync::Arc;

use approx::assert_abs_diff_eq;
use assert_matches::assert_matches;
use glyphwise::{
    geometry::path_from,
    progress::MasteryScale,
    reducer::PathReducer,
    store::{MemoryStore, SqliteStore, StrokeStore},
    Point, PracticeError, PracticeService, StrokeSubmission,
};

fn submission(user_id: i64, character_id: i64, stroke_index: i64, score: f64) -> StrokeSubmission {
    StrokeSubmission {
        user_id,
        character_id,
        stroke_index,
        path: path_from([(0., 0.), (5., 0.), (10., 5.), (15., 0.), (20., 0.)]),
        score,
    }
}

fn run_session(store: Arc<dyn StrokeStore>) -> PracticeService {
    let service = PracticeService::new(PathReducer::default(), store);
    for (stroke, score) in [(0, 0.5), (2, 0.7), (1, 0.9)] {
        service.submit(submission(1, 1, stroke, score)).unwrap();
    }
    service.submit(submission(1, 2, 0, 0.3)).unwrap();
    service.submit(submission(2, 1, 0, 1.0)).unwrap();
    service
}

#[test]
fn memory_session_aggregates_progress() {
    let service = run_session(Arc::new(MemoryStore::default()));

    let progress = service.progress(1).unwrap();
    let first = progress.get(1).unwrap();
    assert_eq!(first.attempts, 3);
    assert_abs_diff_eq!(first.avg_score, 0.7, epsilon = 1e-9);
    assert_abs_diff_eq!(first.mastery, 70.0, epsilon = 1e-9);
    assert_eq!(first.last_stroke, 2);
    assert_eq!(progress.get(2).unwrap().attempts, 1);

    let ids: Vec<_> = service.history(1).unwrap().iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    assert_eq!(service.history(2).unwrap()[0].id, 5);
}

#[test]
fn sqlite_store_matches_memory_store() {
    let dir = tempfile::tempdir().unwrap();
    let sqlite = SqliteStore::open(dir.path().join("strokes.db"), MasteryScale::default()).unwrap();

    let memory = run_session(Arc::new(MemoryStore::default()));
    let persisted = run_session(Arc::new(sqlite));

    for user in [1, 2, 3] {
        let a = memory.progress(user).unwrap();
        let b = persisted.progress(user).unwrap();
        assert_eq!(a.len(), b.len());
        for (pa, pb) in a.iter().zip(b.iter()) {
            assert_eq!(pa.character_id, pb.character_id);
            assert_eq!(pa.attempts, pb.attempts);
            assert_eq!(pa.last_stroke, pb.last_stroke);
            assert_abs_diff_eq!(pa.avg_score, pb.avg_score, epsilon = 1e-9);
        }

        let ha = memory.history(user).unwrap();
        let hb = persisted.history(user).unwrap();
        let ids_a: Vec<_> = ha.iter().map(|a| (a.id, a.stroke_index, a.score)).collect();
        let ids_b: Vec<_> = hb.iter().map(|a| (a.id, a.stroke_index, a.score)).collect();
        assert_eq!(ids_a, ids_b);
    }
}

#[test]
fn unknown_user_yields_empty_results() {
    let service = run_session(Arc::new(MemoryStore::default()));
    assert!(service.progress(404).unwrap().is_empty());
    assert!(service.history(404).unwrap().is_empty());
}

#[test]
fn rejected_submission_reports_reason() {
    let service = PracticeService::new(PathReducer::default(), Arc::new(MemoryStore::default()));
    let result = service.submit(StrokeSubmission {
        path: path_from([(1., 1.)]),
        ..submission(1, 1, 0, 0.5)
    });
    assert_matches!(result, Err(PracticeError::InvalidInput(reason)) if reason.contains("at least 2"));
}

#[test]
fn configured_threshold_flows_into_receipts() {
    let service = PracticeService::new(
        PathReducer::with_threshold(6.0),
        Arc::new(MemoryStore::default()),
    );
    let receipt = service.submit(submission(1, 1, 0, 0.5)).unwrap();
    // deviation of 5.0 is below the raised threshold, so the middle index wins
    assert_eq!(receipt.simplified_nodes[1], Point::new(10., 5.));

    let receipt = service
        .submit(StrokeSubmission {
            path: path_from([(0., 0.), (1., 5.5), (2., 0.), (3., 0.), (4., 0.), (20., 0.)]),
            ..submission(1, 1, 0, 0.5)
        })
        .unwrap();
    assert_eq!(receipt.simplified_nodes[1], Point::new(3., 0.));
}
