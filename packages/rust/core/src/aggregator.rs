//! Merging extraction and enrichment output into final records.

use std::collections::HashMap;

use portfolioscout_shared::{
    CompanyRecord, EnrichmentResult, PortfolioCandidate, canonical_name, clamp_confidence,
};

/// Join candidates with their enrichment by canonical name.
///
/// One record per canonical name, in order of first appearance. Among
/// candidates sharing a name, the highest-confidence one supplies the display
/// name and source (first on ties) and the record carries the max confidence.
/// A matched enrichment beats an unmatched one; the first matched wins.
pub fn aggregate(candidates: &[PortfolioCandidate], enrichments: &[EnrichmentResult]) -> Vec<CompanyRecord> {
    let mut enrichment_by_name: HashMap<String, &EnrichmentResult> = HashMap::new();
    for result in enrichments {
        let key = canonical_name(&result.query_name);
        match enrichment_by_name.get(&key) {
            Some(existing) if existing.matched || !result.matched => {}
            _ => {
                enrichment_by_name.insert(key, result);
            }
        }
    }

    let mut order: Vec<&str> = Vec::new();
    let mut best: HashMap<&str, &PortfolioCandidate> = HashMap::new();
    for candidate in candidates {
        let key = candidate.canonical_name();
        match best.get(key) {
            Some(current) if current.confidence() >= candidate.confidence() => {}
            Some(_) => {
                best.insert(key, candidate);
            }
            None => {
                order.push(key);
                best.insert(key, candidate);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| best.get(key).map(|c| (key, *c)))
        .map(|(key, candidate)| {
            let enrichment = enrichment_by_name.get(key).filter(|e| e.matched);
            let facts = enrichment.map(|e| e.facts.clone()).unwrap_or_default();

            CompanyRecord {
                canonical_name: key.to_string(),
                display_name: candidate.raw_text().to_string(),
                description: facts.description,
                category: facts.category,
                funding_stage: facts.funding_stage,
                country: facts.country,
                funding_amount_usd: facts.funding_amount_usd,
                source_url: enrichment.and_then(|e| e.source_url.clone()),
                extraction_confidence: clamp_confidence(candidate.confidence()),
                source_location: candidate.source_location(),
                matched: enrichment.is_some(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use portfolioscout_shared::{CompanyFacts, FundingStage, SourceLocation};

    use super::*;

    fn text(name: &str, confidence: f32) -> PortfolioCandidate {
        PortfolioCandidate::new(name, SourceLocation::Text, confidence, "portfolio-container")
    }

    fn facts(category: &str) -> CompanyFacts {
        CompanyFacts {
            category: Some(category.to_string()),
            funding_stage: Some(FundingStage::Seed),
            ..CompanyFacts::default()
        }
    }

    #[test]
    fn one_record_per_canonical_name_in_first_order() {
        let candidates = vec![
            text("acme", 0.5),
            text("Beta", 0.7),
            PortfolioCandidate::new("ACME", SourceLocation::Image, 0.35, "ocr"),
            text("Acme", 0.9),
        ];
        let records = aggregate(&candidates, &[]);

        let names: Vec<_> = records.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(names, vec!["Acme", "Beta"]);
        assert_eq!(records[0].extraction_confidence, 0.9);
        assert_eq!(records[0].source_location, SourceLocation::Text);

        let unique: HashSet<_> = records.iter().map(|r| &r.canonical_name).collect();
        assert_eq!(unique.len(), records.len());
    }

    #[test]
    fn unenriched_candidates_are_kept_unmatched() {
        let candidates = vec![text("Acme", 0.9), text("Beta", 0.9)];
        let enrichments = vec![
            EnrichmentResult::unmatched("Acme"),
            EnrichmentResult::matched("Beta", "https://cb.example/beta", facts("SaaS")),
        ];
        let records = aggregate(&candidates, &enrichments);

        assert_eq!(records.len(), 2);
        assert!(!records[0].matched);
        assert!(records[0].category.is_none());
        assert!(records[1].matched);
        assert_eq!(records[1].category.as_deref(), Some("SaaS"));
        assert_eq!(records[1].source_url.as_deref(), Some("https://cb.example/beta"));
    }

    #[test]
    fn first_matched_enrichment_wins() {
        let candidates = vec![text("Acme", 0.9)];
        let enrichments = vec![
            EnrichmentResult::unmatched("acme"),
            EnrichmentResult::matched("Acme", "https://cb.example/1", facts("AI")),
            EnrichmentResult::matched("ACME", "https://cb.example/2", facts("SaaS")),
        ];
        let records = aggregate(&candidates, &enrichments);
        assert_eq!(records[0].category.as_deref(), Some("AI"));
        assert_eq!(records[0].source_url.as_deref(), Some("https://cb.example/1"));
    }

    #[test]
    fn aggregation_is_deterministic() {
        let candidates = vec![text("Acme", 0.9), text("Beta", 0.6), text("beta", 0.6)];
        let enrichments = vec![EnrichmentResult::matched("Beta", "https://cb.example/b", facts("AI"))];
        assert_eq!(aggregate(&candidates, &enrichments), aggregate(&candidates, &enrichments));
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(aggregate(&[], &[EnrichmentResult::unmatched("Ghost")]).is_empty());
    }
}
