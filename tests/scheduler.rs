mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use common::*;
use m3u_prober::errors::AppError;
use m3u_prober::models::{Candidate, CandidateSet, ProbeBudget, UnavailableReason};
use m3u_prober::services::ProbeScheduler;
use tokio_util::sync::CancellationToken;

fn direct_candidates(hosts: usize, per_host: usize) -> (FakeClient, CandidateSet) {
    let mut client = FakeClient::new();
    let mut candidates = Vec::new();
    for host in 0..hosts {
        for item in 0..per_host {
            let url = format!("http://host{host}.test/ch{item}.ts");
            client = client.probe_ok(&url);
            candidates.push(Candidate::new(url));
        }
    }
    (client, candidates.into_iter().collect())
}

#[tokio::test]
async fn test_every_admitted_candidate_gets_one_verdict() {
    let mut client = FakeClient::new();
    let mut candidates = Vec::new();
    for i in 0..60 {
        let url = format!("http://host{}.test/live/{i}.m3u8", i % 5);
        client = match i % 3 {
            0 => client
                .text(&url, &media_manifest(&["s.ts"]))
                .probe_ok(&format!("http://host{}.test/live/s.ts", i % 5)),
            1 => client.text_status(&url, 404),
            _ => client.text(&url, "garbage"),
        };
        candidates.push(Candidate::new(url));
    }
    let scheduler = ProbeScheduler::new(
        ProbeBudget {
            concurrency: 8,
            ..fast_budget()
        },
        Arc::new(client),
    )
    .unwrap();

    let report = scheduler.run(candidates.into_iter().collect()).await;
    let results = &report.results;

    assert_eq!(results.checked(), 60);
    assert_eq!(results.available.len(), 20);
    assert_eq!(results.unavailable.len(), 40);
    assert_eq!(results.skipped, 0);

    let uris: HashSet<&str> = results
        .available
        .iter()
        .map(|e| e.uri.as_str())
        .chain(results.unavailable.iter().map(|e| e.uri.as_str()))
        .collect();
    assert_eq!(uris.len(), 60);

    assert_eq!(report.summary.checked, 60);
    assert_eq!(report.summary.reasons.get("FetchFailed"), Some(&20));
    assert_eq!(report.summary.reasons.get("InvalidManifest"), Some(&20));
}

#[tokio::test]
async fn test_concurrency_limits_hold() {
    let (client, candidates) = direct_candidates(4, 8);
    let client = Arc::new(client.with_delay(Duration::from_millis(20)));
    let budget = ProbeBudget {
        concurrency: 6,
        per_host_limit: 2,
        ..fast_budget()
    };

    let report = ProbeScheduler::new(budget, client.clone())
        .unwrap()
        .run(candidates)
        .await;

    assert_eq!(report.results.available.len(), 32);
    assert!(client.max_in_flight() <= 6, "global {}", client.max_in_flight());
    assert!(client.max_in_flight() >= 2, "probes never overlapped");
    for host in 0..4 {
        let observed = client.max_in_flight_for(&format!("host{host}.test"));
        assert!(observed <= 2, "host{host} saw {observed} concurrent calls");
    }
}

#[tokio::test]
async fn test_single_host_is_bounded_by_per_host_limit() {
    let (client, candidates) = direct_candidates(1, 12);
    let client = Arc::new(client.with_delay(Duration::from_millis(10)));
    let budget = ProbeBudget {
        concurrency: 10,
        per_host_limit: 3,
        ..fast_budget()
    };

    ProbeScheduler::new(budget, client.clone())
        .unwrap()
        .run(candidates)
        .await;

    assert!(client.max_in_flight_for("host0.test") <= 3);
}

#[tokio::test]
async fn test_max_items_caps_admission() {
    let (client, candidates) = direct_candidates(1, 10);
    let client = Arc::new(client);
    let budget = ProbeBudget {
        max_items: Some(3),
        ..fast_budget()
    };

    let report = ProbeScheduler::new(budget, client.clone())
        .unwrap()
        .run(candidates)
        .await;

    assert_eq!(report.results.checked(), 3);
    assert_eq!(report.results.skipped, 7);
    assert_eq!(report.summary.skipped, 7);
    // admission follows input order
    assert_eq!(
        client.touched_urls(),
        vec![
            "http://host0.test/ch0.ts".to_string(),
            "http://host0.test/ch1.ts".to_string(),
            "http://host0.test/ch2.ts".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_max_items_zero_means_unlimited() {
    let (client, candidates) = direct_candidates(2, 3);
    let budget = ProbeBudget {
        max_items: Some(0),
        ..fast_budget()
    };
    let report = ProbeScheduler::new(budget, Arc::new(client))
        .unwrap()
        .run(candidates)
        .await;
    assert_eq!(report.results.checked(), 6);
}

#[tokio::test]
async fn test_cancelled_before_start_admits_nothing() {
    let (client, candidates) = direct_candidates(2, 5);
    let client = Arc::new(client);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = ProbeScheduler::new(fast_budget(), client.clone())
        .unwrap()
        .with_cancellation(cancel)
        .run(candidates)
        .await;

    assert_eq!(report.results.checked(), 0);
    assert_eq!(report.results.skipped, 10);
    assert_eq!(client.total_calls(), 0);
}

#[tokio::test]
async fn test_cancel_mid_run_finishes_promptly() {
    let (client, candidates) = direct_candidates(3, 20);
    let client = Arc::new(client.with_delay(Duration::from_millis(100)));
    let budget = ProbeBudget {
        concurrency: 2,
        per_host_limit: 1,
        ..fast_budget()
    };
    let scheduler = ProbeScheduler::new(budget, client).unwrap();
    let cancel = scheduler.cancellation_token();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        cancel.cancel();
    });

    let report = tokio::time::timeout(Duration::from_secs(5), scheduler.run(candidates))
        .await
        .expect("run did not stop after cancellation");
    let results = report.results;

    assert_eq!(results.checked() + results.skipped, 60);
    assert!(results.skipped > 0);
    assert!(
        results
            .unavailable
            .iter()
            .all(|e| e.reason == UnavailableReason::Cancelled),
        "{:?}",
        results.unavailable
    );
}

#[tokio::test]
async fn test_panicking_evaluation_is_isolated() {
    let (client, candidates) = direct_candidates(1, 4);
    let mut all: Vec<Candidate> = candidates.into_vec();
    all.push(Candidate::new("http://host0.test/panic.ts"));
    let client = Arc::new(client.panicking_on("panic"));

    let report = ProbeScheduler::new(fast_budget(), client)
        .unwrap()
        .run(all.into_iter().collect())
        .await;

    assert_eq!(report.results.available.len(), 4);
    assert_eq!(report.results.unavailable.len(), 1);
    let faulted = &report.results.unavailable[0];
    assert_eq!(faulted.uri, "http://host0.test/panic.ts");
    assert_eq!(faulted.reason, UnavailableReason::Internal);
}

#[tokio::test]
async fn test_available_entries_are_sorted_by_name() {
    let client = FakeClient::new()
        .probe_ok("http://a.test/1.ts")
        .probe_ok("http://a.test/2.ts")
        .probe_ok("http://a.test/3.ts");
    let candidates: CandidateSet = vec![
        Candidate::new("http://a.test/1.ts").with_display_name("Zulu"),
        Candidate::new("http://a.test/2.ts").with_display_name("Alpha"),
        Candidate::new("http://a.test/3.ts").with_display_name("Mike"),
    ]
    .into_iter()
    .collect();

    let report = ProbeScheduler::new(fast_budget(), Arc::new(client))
        .unwrap()
        .run(candidates)
        .await;

    let names: Vec<&str> = report
        .results
        .available
        .iter()
        .map(|e| e.display_name.as_str())
        .collect();
    assert_eq!(names, vec!["Alpha", "Mike", "Zulu"]);
}

#[test]
fn test_zero_concurrency_is_rejected() {
    let budget = ProbeBudget {
        concurrency: 0,
        ..ProbeBudget::default()
    };
    let result = ProbeScheduler::new(budget, Arc::new(FakeClient::new()));
    assert!(matches!(result, Err(AppError::Configuration { .. })));
}

#[test]
fn test_zero_timeout_is_rejected() {
    let budget = ProbeBudget {
        timeout: Duration::ZERO,
        ..ProbeBudget::default()
    };
    assert!(ProbeScheduler::new(budget, Arc::new(FakeClient::new())).is_err());
}
