//! Portfolio-level analytics over the final records.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use portfolioscout_shared::{CompanyRecord, FundingStage};

/// How many countries the summary ranks.
const TOP_COUNTRIES: usize = 3;

/// Aggregate view of one fund's portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total: usize,
    pub matched: usize,
    /// Companies per category, categories in order of first appearance.
    pub categories: Vec<CategoryGroup>,
    /// Stage histogram, earliest stage first.
    pub stages: Vec<StageCount>,
    /// Most frequent countries, at most three.
    pub top_countries: Vec<CountryCount>,
    /// Mean of known funding amounts, in USD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_funding_usd: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub category: String,
    pub companies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCount {
    pub stage: FundingStage,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryCount {
    pub country: String,
    pub count: usize,
}

impl PortfolioSummary {
    pub fn unmatched(&self) -> usize {
        self.total - self.matched
    }
}

/// Summarize records.
pub fn summarize(records: &[CompanyRecord]) -> PortfolioSummary {
    let mut categories: Vec<CategoryGroup> = Vec::new();
    let mut stages: BTreeMap<FundingStage, usize> = BTreeMap::new();
    let mut countries: Vec<CountryCount> = Vec::new();
    let mut country_index: HashMap<&str, usize> = HashMap::new();
    let mut amounts: Vec<u64> = Vec::new();

    for record in records {
        if let Some(category) = &record.category {
            match categories.iter_mut().find(|g| &g.category == category) {
                Some(group) => group.companies.push(record.display_name.clone()),
                None => categories.push(CategoryGroup {
                    category: category.clone(),
                    companies: vec![record.display_name.clone()],
                }),
            }
        }
        if let Some(stage) = record.funding_stage {
            *stages.entry(stage).or_default() += 1;
        }
        if let Some(country) = record.country.as_deref() {
            match country_index.get(country) {
                Some(&idx) => countries[idx].count += 1,
                None => {
                    country_index.insert(country, countries.len());
                    countries.push(CountryCount {
                        country: country.to_string(),
                        count: 1,
                    });
                }
            }
        }
        if let Some(amount) = record.funding_amount_usd {
            amounts.push(amount);
        }
    }

    // stable sort keeps first-appearance order among ties
    countries.sort_by(|a, b| b.count.cmp(&a.count));
    countries.truncate(TOP_COUNTRIES);

    let average_funding_usd = (!amounts.is_empty())
        .then(|| (amounts.iter().map(|&a| a as u128).sum::<u128>() / amounts.len() as u128) as u64);

    PortfolioSummary {
        total: records.len(),
        matched: records.iter().filter(|r| r.matched).count(),
        categories,
        stages: stages
            .into_iter()
            .map(|(stage, count)| StageCount { stage, count })
            .collect(),
        top_countries: countries,
        average_funding_usd,
    }
}
