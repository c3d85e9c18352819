//! Detector tests covering learning, both detection paths and shared use

use super::*;
use crate::clustering::{ClusteringEngine, KMeansConfig};
use crate::config::DetectionConfig;
use crate::error::AnalyzerError;
use crate::models::{metric_names, Sample};
use chrono::{TimeDelta, Utc};
use std::sync::Arc;
use std::thread;

fn samples(values: &[f64]) -> Vec<Sample> {
    let start = Utc::now() - TimeDelta::seconds(values.len() as i64);
    values
        .iter()
        .enumerate()
        .map(|(i, v)| Sample::new(start + TimeDelta::seconds(i as i64), *v))
        .collect()
}

fn detector(window_size: usize, k: usize) -> Detector {
    let config = DetectionConfig {
        window_size,
        ..DetectionConfig::default()
    };
    let engine = ClusteringEngine::new(KMeansConfig {
        k,
        ..KMeansConfig::default()
    });
    Detector::new(config, engine)
}

#[test]
fn test_learn_requires_window_of_data() {
    let detector = detector(5, 2);
    let err = detector
        .learn_baseline("checkout", &samples(&[100.0; 4]))
        .unwrap_err();
    assert!(matches!(
        err,
        AnalyzerError::InsufficientData {
            required: 5,
            available: 4
        }
    ));
    assert!(err.is_recoverable());
    assert!(detector.baseline("checkout").is_none());
}

#[test]
fn test_failed_fit_keeps_previous_baseline() {
    let detector = detector(5, 2);
    detector
        .learn_baseline("checkout", &samples(&[100.0; 20]))
        .unwrap();
    let before = detector.baseline("checkout").unwrap();

    // exactly one window: no feature vectors to cluster
    let err = detector
        .learn_baseline("checkout", &samples(&[500.0; 5]))
        .unwrap_err();
    assert!(matches!(err, AnalyzerError::InsufficientPoints { .. }));
    assert!(Arc::ptr_eq(&before, &detector.baseline("checkout").unwrap()));
}

#[test]
fn test_relearn_replaces_baseline() {
    let detector = detector(5, 2);
    let first = detector
        .learn_baseline("checkout", &samples(&[100.0; 20]))
        .unwrap();
    let second = detector
        .learn_baseline("checkout", &samples(&[10.0; 30]))
        .unwrap();

    assert_eq!(first.total_points(), 15);
    assert_eq!(second.total_points(), 25);
    assert_eq!(detector.baseline("checkout").unwrap().total_points(), 25);
    assert_eq!(detector.baselines().len(), 1);
}

#[test]
fn test_no_baseline_skips_behavioral_path() {
    let detector = detector(5, 2);
    let mut values = vec![100.0; 20];
    values.extend([900.0; 6]);
    let anomalies = detector.detect_anomalies("checkout", &samples(&values));

    assert!(anomalies
        .iter()
        .all(|a| a.anomaly_type != AnomalyType::BehavioralAnomaly));
}

#[test]
fn test_normal_traffic_is_quiet() {
    let detector = detector(5, 2);
    let points = samples(&[100.0; 30]);
    detector.learn_baseline("checkout", &points).unwrap();

    // the error rate rule reads the same series, so only check the other two
    let anomalies = detector.detect_anomalies("checkout", &points);
    assert!(anomalies.iter().all(|a| matches!(a.anomaly_type, AnomalyType::ErrorRateHigh)));
}

#[test]
fn test_behavioral_anomaly_after_baseline() {
    let detector = detector(5, 2);
    detector
        .learn_baseline("checkout", &samples(&[100.0; 30]))
        .unwrap();

    let mut values = vec![100.0; 20];
    values.extend([500.0; 6]);
    let points = samples(&values);
    let anomalies = detector.detect_anomalies("checkout", &points);

    // static findings come first, the behavioral one last
    let types: Vec<AnomalyType> = anomalies.iter().map(|a| a.anomaly_type).collect();
    assert_eq!(
        types,
        vec![
            AnomalyType::TrafficSpike,
            AnomalyType::ErrorRateHigh,
            AnomalyType::BehavioralAnomaly,
        ]
    );
    let behavioral = &anomalies[2];
    assert_eq!(behavioral.timestamp, points.last().unwrap().timestamp);
    assert!(behavioral.severity > 1.0);
    // identical training windows collapse the threshold to the 1.0 fallback
    assert_eq!(behavioral.metrics["threshold"], 1.0);
    assert!((behavioral.severity - behavioral.metrics["anomaly_distance"]).abs() < 1e-9);
}

#[test]
fn test_detect_service_routes_metrics() {
    let detector = detector(5, 2);
    let window = ServiceWindow::new(metric_names::REQUEST_COUNT)
        .with_series(metric_names::REQUEST_COUNT, samples(&[100.0; 10]))
        .with_series(metric_names::ERROR_RATE, samples(&[0.01, 0.2]))
        .with_series(metric_names::LATENCY_P99, samples(&[2000.0]))
        .with_series(metric_names::CIRCUIT_BREAKERS, samples(&[1.0]))
        .with_series(metric_names::RETRY_COUNT, samples(&[5.0]));

    let types: Vec<AnomalyType> = detector
        .detect_service("checkout", &window)
        .into_iter()
        .map(|a| a.anomaly_type)
        .collect();
    assert_eq!(
        types,
        vec![
            AnomalyType::ErrorRateHigh,
            AnomalyType::LatencyAnomaly,
            AnomalyType::CircuitBreaker,
        ]
    );
}

#[test]
fn test_three_point_series_spikes_against_empty_prior() {
    let detector = Detector::default();
    let anomalies = detector.detect_anomalies("svc", &samples(&[500.0, 500.0, 500.0]));

    let spike = anomalies
        .iter()
        .find(|a| a.anomaly_type == AnomalyType::TrafficSpike)
        .unwrap();
    assert_eq!(spike.severity, 1.0);
}

#[test]
fn test_static_rules_need_two_points() {
    let detector = Detector::default();
    assert!(detector.detect_anomalies("svc", &samples(&[0.5])).is_empty());
    assert!(detector.detect_static("svc", &[]).is_empty());

    // routed per metric, a lone error rate reading still counts
    let window = ServiceWindow::new(metric_names::REQUEST_COUNT)
        .with_series(metric_names::ERROR_RATE, samples(&[0.5]));
    let types: Vec<AnomalyType> = detector
        .detect_service("svc", &window)
        .into_iter()
        .map(|a| a.anomaly_type)
        .collect();
    assert_eq!(types, vec![AnomalyType::ErrorRateHigh]);
}

#[test]
fn test_learn_returns_own_baseline_under_contention() {
    let detector = Arc::new(detector(5, 2));

    let handles: Vec<_> = [(30usize, 25usize), (20, 15)]
        .into_iter()
        .map(|(len, expected_points)| {
            let detector = Arc::clone(&detector);
            let points = samples(&vec![100.0; len]);
            thread::spawn(move || {
                for _ in 0..100 {
                    let baseline = detector.learn_baseline("checkout", &points).unwrap();
                    assert_eq!(baseline.total_points(), expected_points);
                }
            })
        })
        .chain(std::iter::once({
            let detector = Arc::clone(&detector);
            thread::spawn(move || {
                for _ in 0..100 {
                    detector.baselines().remove("checkout");
                }
            })
        }))
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_detect_service_missing_series() {
    let detector = detector(5, 2);
    let window = ServiceWindow::default();
    assert!(detector.detect_service("checkout", &window).is_empty());
}

#[test]
fn test_concurrent_learn_and_detect() {
    let detector = Arc::new(detector(5, 2));
    let normal = samples(&[100.0; 30]);
    let mut spiky_values = vec![100.0; 20];
    spiky_values.extend([500.0; 6]);
    let spiky = samples(&spiky_values);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let detector = Arc::clone(&detector);
            let normal = normal.clone();
            let spiky = spiky.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    if t % 2 == 0 {
                        detector.learn_baseline("checkout", &normal).unwrap();
                    } else {
                        let anomalies = detector.detect_anomalies("checkout", &spiky);
                        for anomaly in anomalies {
                            assert!(anomaly.severity.is_finite());
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(detector.baseline("checkout").unwrap().total_points(), 25);
}
