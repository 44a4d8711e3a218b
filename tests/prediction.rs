//! The shipped model artifact loads, predicts only known classes, degrades
//! to the default on incomplete profiles, and predictions are recorded for
//! accuracy reporting.

mod common;

use auroramart::storage::ProfileUpdate;
use auroramart::types::{Education, EmploymentStatus, Gender, Occupation};
use auroramart::PredictorService;
use std::path::Path;

fn load_shipped_model() -> PredictorService {
    PredictorService::load(Path::new("model/category_tree.json")).expect("shipped model loads")
}

#[tokio::test]
async fn test_predictions_stay_in_the_class_set() {
    let (store, _dir) = common::create_test_store().await;
    let predictor = load_shipped_model();
    let classes = predictor.status().classes;

    for (age, income_cents) in [(19, 120_000), (28, 450_000), (41, 900_000), (66, 300_000)] {
        let user = common::create_customer(&store, "shopper").await;
        store
            .update_profile(
                user.id,
                &ProfileUpdate {
                    age: Some(age),
                    gender: Some(Gender::Female),
                    employment_status: Some(EmploymentStatus::FullTime),
                    occupation: Some(Occupation::Tech),
                    education: Some(Education::Bachelor),
                    monthly_income_cents: Some(income_cents),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let profile = store.get_profile(user.id).await.unwrap();
        let prediction = predictor.predict(&profile);
        assert!(classes.contains(&prediction.category_name));
        assert!(!prediction.fallback);
        assert!(prediction.confidence > 0.0 && prediction.confidence <= 1.0);
    }
}

#[tokio::test]
async fn test_incomplete_profile_degrades_to_default() {
    let (store, _dir) = common::create_test_store().await;
    let predictor = load_shipped_model();

    let user = common::create_customer(&store, "sparse").await;
    store
        .update_profile(
            user.id,
            &ProfileUpdate {
                age: Some(30),
                gender: Some(Gender::Male),
                // occupation and education missing
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let profile = store.get_profile(user.id).await.unwrap();
    let prediction = predictor.predict(&profile);
    assert!(prediction.fallback);
    assert_eq!(prediction.category_name, "Electronics");
}

#[tokio::test]
async fn test_prediction_recording_and_accuracy() {
    let (store, _dir) = common::create_test_store().await;
    let (category, _) = common::seed_catalog(&store, 1, 10).await;
    let user = common::create_customer(&store, "tracked").await;

    let first = store
        .record_prediction(user.id, category.id, 0.72, "v3", false)
        .await
        .unwrap();
    let second = store
        .record_prediction(user.id, category.id, 0.27, "v3", true)
        .await
        .unwrap();

    // Only the first gets an observed outcome
    store.mark_prediction_outcome(first.id, true).await.unwrap();

    let records = store.list_predictions_for_user(user.id).await.unwrap();
    assert_eq!(records.len(), 2);

    let accuracy = store.prediction_accuracy().await.unwrap();
    assert_eq!(accuracy.total_predictions, 2);
    assert_eq!(accuracy.labeled, 1);
    assert_eq!(accuracy.correct, 1);
    assert_eq!(accuracy.fallback_count, 1);
    assert_eq!(accuracy.accuracy, Some(1.0));

    let fetched = store.get_prediction(second.id).await.unwrap();
    assert!(fetched.fallback);
    assert_eq!(fetched.correct, None);
}
