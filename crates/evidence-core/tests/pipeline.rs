//! End-to-end evidence assembly with deterministic model doubles

mod common;

use common::fetch::ScriptedFetcher;
use common::models::{keyword_services, nli_services};
use evidence_core::evidence::SourceType;
use evidence_core::pipeline::is_rank_ordered;
use evidence_core::{
    Claim, Enricher, EvidenceAssembler, EvidenceReport, Polarity, PoolDocument, RetrievalConfig,
    VectorBackend,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

const CLAIM: &str = "XYZ city bans plastic bags";

fn claim() -> Claim {
    Claim::new(CLAIM, Some("CLM-20240305-0badf00d".to_string()))
}

fn scenario_pool() -> Vec<PoolDocument> {
    vec![
        PoolDocument::new(
            "XYZ city bans plastic bags? This is false and misleading.",
            "https://randomblog.xyz/posts/bag-ban",
        ),
        PoolDocument::new(
            "XYZ city bans plastic bags, officials confirmed on Monday.",
            "https://www.doh.gov.ph/press/bag-ban",
        ),
        PoolDocument::new(
            "Weather outlook for the weekend in the region.",
            "https://weather.example.org/outlook",
        ),
    ]
}

async fn run(config: RetrievalConfig, pool: Vec<PoolDocument>) -> EvidenceReport {
    EvidenceAssembler::new(config, keyword_services())
        .run(&claim(), pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_credible_supporting_source_ranks_first() {
    let report = run(RetrievalConfig::default(), scenario_pool()).await;
    let evidences = &report.retrieved_evidences;

    assert_eq!(report.claim_id, "CLM-20240305-0badf00d");
    assert_eq!(report.claim_text, CLAIM);
    assert_eq!(evidences.len(), 3);

    let gov = &evidences[0];
    assert_eq!(gov.domain.as_deref(), Some("doh.gov.ph"));
    assert_eq!(gov.credibility_score, 0.98);
    assert_eq!(gov.relevance_score, 1.0);
    assert_eq!(gov.polarity, Polarity::Supports);

    let blog = &evidences[1];
    assert_eq!(blog.domain.as_deref(), Some("randomblog.xyz"));
    assert_eq!(blog.credibility_score, 0.6);
    assert_eq!(blog.relevance_score, 1.0);
    assert_eq!(blog.polarity, Polarity::Refutes);

    let unrelated = &evidences[2];
    assert_eq!(unrelated.relevance_score, 0.0);
    assert_eq!(unrelated.credibility_score, 0.85);
    assert_eq!(unrelated.evidence_id, "EV-003");
}

#[tokio::test]
async fn test_nli_classifier_drives_polarity() {
    let pool = vec![
        PoolDocument::new("The plastic bag ban was approved by XYZ city.", "https://a.com/1"),
        PoolDocument::new("XYZ city denied any plastic bag ban.", "https://b.com/2"),
        PoolDocument::new("Unparseable plastic bags text.", "https://c.com/3"),
    ];

    let report = EvidenceAssembler::new(RetrievalConfig::default(), nli_services())
        .run(&claim(), pool)
        .await
        .unwrap();

    for evidence in &report.retrieved_evidences {
        let expected = match evidence.domain.as_deref() {
            Some("a.com") => Polarity::Supports,
            Some("b.com") => Polarity::Refutes,
            _ => Polarity::Neutral,
        };
        assert_eq!(evidence.polarity, expected, "{:?}", evidence.url);
    }
}

#[tokio::test]
async fn test_empty_pool_yields_claim_evidence() {
    let report = run(RetrievalConfig::default(), vec![]).await;

    assert_eq!(report.retrieved_evidences.len(), 1);
    let evidence = &report.retrieved_evidences[0];
    assert_eq!(evidence.snippet, CLAIM);
    assert_eq!(evidence.url, None);
    assert_eq!(evidence.domain, None);
    assert_eq!(evidence.relevance_score, 1.0);
    assert_eq!(evidence.credibility_score, 0.6);
    assert_eq!(evidence.metadata.source_type, SourceType::LocalCorpus);
}

#[tokio::test]
async fn test_blank_pool_entries_are_ignored() {
    let pool = vec![PoolDocument::new("   ", "https://a.com"), PoolDocument::new("", "")];
    let report = run(RetrievalConfig::default(), pool).await;

    assert_eq!(report.retrieved_evidences.len(), 1);
    assert_eq!(report.retrieved_evidences[0].snippet, CLAIM);
}

#[tokio::test]
async fn test_runs_are_deterministic() {
    for backend in [VectorBackend::Tensor, VectorBackend::BruteForce] {
        let config = RetrievalConfig {
            vector_backend: backend,
            ..RetrievalConfig::default()
        };
        let first = run(config.clone(), scenario_pool()).await;
        let second = run(config, scenario_pool()).await;
        assert_eq!(first, second);
    }
}

#[tokio::test]
async fn test_vector_backends_agree() {
    let tensor = run(
        RetrievalConfig {
            vector_backend: VectorBackend::Tensor,
            ..RetrievalConfig::default()
        },
        scenario_pool(),
    )
    .await;
    let brute = run(
        RetrievalConfig {
            vector_backend: VectorBackend::BruteForce,
            ..RetrievalConfig::default()
        },
        scenario_pool(),
    )
    .await;

    assert_eq!(tensor, brute);
}

#[tokio::test]
async fn test_output_invariants() {
    let mut pool = scenario_pool();
    for i in 0..20 {
        pool.push(PoolDocument::new(
            format!("Report {} on plastic use and city rules", i),
            format!("https://site{}.com/{}", i % 4, i),
        ));
    }

    let report = run(RetrievalConfig::default(), pool).await;
    let evidences = &report.retrieved_evidences;

    assert_eq!(evidences.len(), 23);
    assert!(is_rank_ordered(evidences));
    for (i, evidence) in evidences.iter().enumerate() {
        assert_eq!(evidence.evidence_id, format!("EV-{:03}", i + 1));
        assert!((0.0..=1.0).contains(&evidence.relevance_score));
        assert!((0.0..=1.0).contains(&evidence.credibility_score));
        assert!([-1, 0, 1].contains(&evidence.polarity.as_i8()));
        assert!(evidence.snippet.chars().count() <= 1000);
    }
}

#[tokio::test]
async fn test_final_k_limits_output() {
    let config = RetrievalConfig {
        final_k: 2,
        ..RetrievalConfig::default()
    };
    let report = run(config, scenario_pool()).await;
    assert_eq!(report.retrieved_evidences.len(), 2);
}

#[tokio::test]
async fn test_enrichment_replaces_snippet_and_keeps_timed_out_items() {
    let fetcher = ScriptedFetcher::default()
        .page(
            "https://randomblog.xyz/posts/bag-ban",
            "SHOCKING!!! The bag ban story is FALSE, you won't believe it!",
            Some("2024-03-04"),
            Some("Anon Blogger"),
        )
        .slow("https://www.doh.gov.ph/press/bag-ban");
    let enricher = Enricher::new(Arc::new(fetcher), 6, Duration::from_millis(200));

    let baseline = run(RetrievalConfig::default(), scenario_pool()).await;
    let report = EvidenceAssembler::new(RetrievalConfig::default(), keyword_services())
        .with_enricher(enricher)
        .run(&claim(), scenario_pool())
        .await
        .unwrap();

    // timed out: untouched
    assert_eq!(report.retrieved_evidences[0], baseline.retrieved_evidences[0]);
    assert_eq!(report.retrieved_evidences[0].publication_date, None);

    let blog = &report.retrieved_evidences[1];
    assert_eq!(
        blog.snippet,
        "SHOCKING!!! The bag ban story is FALSE, you won't believe it!"
    );
    assert_eq!(blog.publication_date.as_deref(), Some("2024-03-04"));
    assert_eq!(blog.metadata.author.as_deref(), Some("Anon Blogger"));
    assert!(blog.metadata.writing_style_features.sensational_language);
    assert_eq!(blog.polarity, Polarity::Refutes);
    assert_ne!(
        blog.metadata.writing_style_features,
        baseline.retrieved_evidences[1].metadata.writing_style_features
    );

    // 404: untouched
    assert_eq!(report.retrieved_evidences[2], baseline.retrieved_evidences[2]);
}

#[tokio::test]
async fn test_enrichment_is_limited_to_top_k() {
    let fetcher = ScriptedFetcher::default().page(
        "https://weather.example.org/outlook",
        "Fetched forecast text.",
        None,
        None,
    );
    let config = RetrievalConfig {
        enrich_top_k: 2,
        ..RetrievalConfig::default()
    };
    let enricher = Enricher::from_config(Arc::new(fetcher), &config);

    let report = EvidenceAssembler::new(config, keyword_services())
        .with_enricher(enricher)
        .run(&claim(), scenario_pool())
        .await
        .unwrap();

    // third-ranked item is outside the enrichment window
    assert_eq!(
        report.retrieved_evidences[2].snippet,
        "Weather outlook for the weekend in the region."
    );
}

#[tokio::test]
async fn test_prefetch_replaces_pool_text() {
    let fetcher = ScriptedFetcher::default().page(
        "https://weather.example.org/outlook",
        "XYZ city bans plastic bags starting next month, the council reported.",
        None,
        None,
    );
    let config = RetrievalConfig {
        prefetch_pool: true,
        enrich_top_k: 0,
        ..RetrievalConfig::default()
    };
    let enricher = Enricher::from_config(Arc::new(fetcher), &config);

    let report = EvidenceAssembler::new(config, keyword_services())
        .with_enricher(enricher)
        .run(&claim(), scenario_pool())
        .await
        .unwrap();

    let weather = report
        .retrieved_evidences
        .iter()
        .find(|e| e.domain.as_deref() == Some("weather.example.org"))
        .unwrap();
    assert!(weather.snippet.starts_with("XYZ city bans plastic bags starting"));
    assert_eq!(weather.relevance_score, 1.0);
}

#[tokio::test]
async fn test_report_round_trips_through_file() {
    let report = run(RetrievalConfig::default(), scenario_pool()).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.json");

    report.write_json(&path).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

    assert_eq!(value["claim_id"], "CLM-20240305-0badf00d");
    assert_eq!(value["retrieved_evidences"][0]["evidence_id"], "EV-001");
    assert_eq!(value["retrieved_evidences"][0]["polarity"], 1);
    assert_eq!(value["retrieved_evidences"][1]["polarity"], -1);
    assert_eq!(
        value["retrieved_evidences"][0]["metadata"]["publication_history"],
        "reputable"
    );
}
