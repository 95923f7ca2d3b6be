//! Picking the search hit most likely to describe the company.

use url::Url;

use portfolioscout_shared::name_slug;

use crate::search::SearchHit;

/// A hit must score at least this much to be fetched.
pub const MIN_HIT_SCORE: u32 = 2;

/// Substitute the company name into a query template.
pub fn build_query(template: &str, name: &str) -> String {
    template.replace("{name}", name)
}

/// Score a hit: +2 title mentions the name, +2 URL carries the name slug,
/// +1 host is a preferred domain.
pub fn score_hit(hit: &SearchHit, name: &str, preferred_domains: &[String]) -> u32 {
    let mut score = 0;

    if hit.title.to_lowercase().contains(&name.to_lowercase()) {
        score += 2;
    }

    let slug = name_slug(name);
    let Ok(url) = Url::parse(&hit.url) else {
        return score;
    };
    let location = format!("{}{}", url.host_str().unwrap_or_default(), url.path()).to_lowercase();
    if !slug.is_empty() && (location.contains(&slug) || location.contains(&slug.replace('-', ""))) {
        score += 2;
    }

    if let Some(host) = url.host_str() {
        let host = host.to_lowercase();
        if preferred_domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{d}")))
        {
            score += 1;
        }
    }

    score
}

/// The best-scoring hit at or above [`MIN_HIT_SCORE`], earliest on ties.
pub fn select_hit<'a>(hits: &'a [SearchHit], name: &str, preferred_domains: &[String]) -> Option<&'a SearchHit> {
    let mut best: Option<(u32, &SearchHit)> = None;
    for hit in hits {
        let score = score_hit(hit, name, preferred_domains);
        if score >= MIN_HIT_SCORE && best.is_none_or(|(s, _)| score > s) {
            best = Some((score, hit));
        }
    }
    best.map(|(_, hit)| hit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(title: &str, url: &str) -> SearchHit {
        SearchHit {
            title: title.into(),
            url: url.into(),
            snippet: String::new(),
        }
    }

    fn crunchbase() -> Vec<String> {
        vec!["crunchbase.com".to_string()]
    }

    #[test]
    fn query_template_substitution() {
        assert_eq!(
            build_query("site:crunchbase.com \"{name}\"", "Beta Corp"),
            "site:crunchbase.com \"Beta Corp\""
        );
    }

    #[test]
    fn scoring_components() {
        let domains = crunchbase();
        assert_eq!(score_hit(&hit("Beta Corp - Crunchbase", "https://www.crunchbase.com/organization/beta-corp"), "Beta Corp", &domains), 5);
        assert_eq!(score_hit(&hit("Funding news", "https://betacorp.example/"), "Beta Corp", &domains), 2);
        assert_eq!(score_hit(&hit("Unrelated", "https://www.crunchbase.com/hub/fintech"), "Beta Corp", &domains), 1);
        assert_eq!(score_hit(&hit("BETA CORP raises", "not a url"), "Beta Corp", &domains), 2);
    }

    #[test]
    fn selects_best_hit_earliest_on_ties() {
        let hits = vec![
            hit("Acme blog", "https://blog.example/acme-news"),
            hit("Acme - Crunchbase", "https://www.crunchbase.com/organization/acme"),
            hit("Acme - Crunchbase", "https://www.crunchbase.com/organization/acme-2"),
        ];
        let chosen = select_hit(&hits, "Acme", &crunchbase()).unwrap();
        assert_eq!(chosen.url, "https://www.crunchbase.com/organization/acme");
    }

    #[test]
    fn weak_hits_are_rejected() {
        let hits = vec![hit("Top startups", "https://www.crunchbase.com/lists/top")];
        assert!(select_hit(&hits, "Acme", &crunchbase()).is_none());
    }
}
