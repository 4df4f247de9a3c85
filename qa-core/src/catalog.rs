//! Static reference data: dataset citations and sample questions.

use serde::Serialize;

/// A data.gov.in dataset that answers may cite.
///
/// `id` is the catalog key quoted in prompts. Only entries with a known
/// datastore `resource_id` are credited as a concrete resource; the rest are
/// credited by topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatasetEntry {
    pub id: &'static str,
    pub title: &'static str,
    pub organization: &'static str,
    pub category: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<&'static str>,
}

impl DatasetEntry {
    /// Label used in answer sources.
    pub fn source_label(&self) -> String {
        match self.resource_id {
            Some(rid) => format!("{} (data.gov.in resource {rid})", self.title),
            None => format!("{} (data.gov.in topic: {})", self.title, self.category),
        }
    }
}

/// Datasets known to the assistant. Read-only for the process lifetime.
pub const DATASET_CATALOG: &[DatasetEntry] = &[
    DatasetEntry {
        id: "mandi-commodity-prices",
        title: "Current Daily Price of Various Commodities from Various Markets (Mandi)",
        organization: "Ministry of Agriculture and Farmers Welfare",
        category: "Crop Prices",
        resource_id: Some("9ef84268-d588-465a-a308-a864a43d0070"),
    },
    DatasetEntry {
        id: "district-wise-season-wise-crop-production-statistics",
        title: "District-wise, Season-wise Crop Production Statistics",
        organization: "Directorate of Economics and Statistics",
        category: "Agricultural Production",
        resource_id: None,
    },
    DatasetEntry {
        id: "sub-divisional-monthly-rainfall-1901-2017",
        title: "Sub Divisional Monthly Rainfall from 1901 to 2017",
        organization: "India Meteorological Department",
        category: "Rainfall Patterns",
        resource_id: None,
    },
    DatasetEntry {
        id: "all-india-seasonal-and-annual-mean-temperature",
        title: "All India Seasonal and Annual Mean Temperature Series",
        organization: "India Meteorological Department",
        category: "Climate Data",
        resource_id: None,
    },
    DatasetEntry {
        id: "state-wise-soil-health-cards-distributed",
        title: "State-wise Soil Health Cards Distributed",
        organization: "Department of Agriculture and Farmers Welfare",
        category: "Soil Health",
        resource_id: None,
    },
    DatasetEntry {
        id: "minimum-support-prices-kharif-rabi-crops",
        title: "Minimum Support Prices for Kharif and Rabi Crops",
        organization: "Commission for Agricultural Costs and Prices",
        category: "Government Policies",
        resource_id: None,
    },
];

/// Question ideas shown by the dashboard help popover.
pub const SAMPLE_QUESTIONS: &[&str] = &[
    "Which states produce the most rice?",
    "How has wheat production changed?",
    "What are the monsoon patterns?",
    "Compare Maharashtra and Punjab farming",
    "Tell me about organic farming in India",
    "What is the Minimum Support Price?",
];
