//! Static product catalog
//!
//! The expert answers only from this data. Product entries carry keywords
//! so degraded answers can still quote exact facts.

/// Company data given to the expert model
pub const COMPANY_DATA: &str = "\
Our company 'AI Solutions Corp' specialises in developing advanced AI solutions for businesses.

The main products are:
1. Document Analyzer - Automated document and invoice processing system
   - Uses OCR and NLP for data extraction
   - Integrates with ERP systems
   - 99.7% recognition accuracy
   - Price: from $5,000/month for basic version
   - Supports formats: PDF, JPG, PNG, TIFF
   - Processing time: up to 1000 documents per hour

2. Vision AI - warehouse monitoring and inventory solution
   - Computer vision for tracking goods
   - Automatic inventory update
   - Anomaly and shortage detection
   - Price: from $8,000/month
   - Camera support: IP cameras, USB cameras
   - Detection accuracy: 98.5%

Founded in 2020, over 500 successful implementations, offices in 15 countries.
24/7 technical support, 30 days money back guarantee.
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub name: &'static str,
    pub summary: &'static str,
    pub price: &'static str,
    pub facts: &'static [&'static str],
    pub keywords: &'static [&'static str],
}

impl Product {
    /// Whether `text` refers to this product
    pub fn matches(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        lower.contains(&self.name.to_lowercase())
            || self.keywords.iter().any(|k| lower.contains(k))
    }

    /// One-paragraph fact sheet quoting the catalog verbatim
    pub fn fact_sheet(&self) -> String {
        format!(
            "{} - {}. Price: {}. {}.",
            self.name,
            self.summary,
            self.price,
            self.facts.join("; ")
        )
    }
}

pub const PRODUCTS: &[Product] = &[
    Product {
        name: "Document Analyzer",
        summary: "Automated document and invoice processing system",
        price: "from $5,000/month for basic version",
        facts: &[
            "Uses OCR and NLP for data extraction",
            "Integrates with ERP systems",
            "99.7% recognition accuracy",
            "Supports formats: PDF, JPG, PNG, TIFF",
            "Processing time: up to 1000 documents per hour",
        ],
        keywords: &["document", "invoice", "ocr", "erp", "pdf"],
    },
    Product {
        name: "Vision AI",
        summary: "warehouse monitoring and inventory solution",
        price: "from $8,000/month",
        facts: &[
            "Computer vision for tracking goods",
            "Automatic inventory update",
            "Anomaly and shortage detection",
            "Camera support: IP cameras, USB cameras",
            "Detection accuracy: 98.5%",
        ],
        keywords: &["vision", "warehouse", "inventory", "camera", "monitoring"],
    },
];

/// Company facts outside any single product
pub const COMPANY_FACTS: &str = "AI Solutions Corp was founded in 2020, has over 500 successful implementations and offices in 15 countries, with 24/7 technical support and a 30 days money back guarantee.";

/// Products referred to by `text`, in catalog order
pub fn products_mentioned(text: &str) -> Vec<&'static Product> {
    PRODUCTS.iter().filter(|p| p.matches(text)).collect()
}
