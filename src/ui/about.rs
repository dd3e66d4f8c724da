use eframe::egui::{RichText, Ui};

use crate::config::DashboardConfig;
use crate::data::model::RECORD_SCHEMA;
use crate::predict::handle::ModelSummary;

// ---------------------------------------------------------------------------
// Model description
// ---------------------------------------------------------------------------

/// What the About Model view says, filled from the artifact's metadata where
/// it has any.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescription {
    pub algorithm: String,
    pub target: String,
    pub features: String,
    pub trees: Option<usize>,
    pub metrics: Vec<(String, String)>,
    pub notes: Vec<String>,
}

impl ModelDescription {
    pub fn from_summary(summary: &ModelSummary) -> Self {
        let algorithm = summary
            .algorithm
            .clone()
            .unwrap_or_else(|| "Random Forest Regressor".to_string());
        let target = if summary.target.is_empty() {
            "Log of Selling Price".to_string()
        } else {
            summary.target.clone()
        };
        let features = if summary.feature_names.is_empty() {
            RECORD_SCHEMA
                .iter()
                .map(|spec| spec.name)
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            summary.feature_names.join(", ")
        };
        let metrics = if summary.metrics.is_empty() {
            vec![
                ("MAE".to_string(), "₹2.9 Lakh".to_string()),
                ("RMSE".to_string(), "₹6.6 Lakh".to_string()),
            ]
        } else {
            summary
                .metrics
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };
        let notes = if summary.notes.is_empty() {
            vec![
                "Random Forest handles non-linear relationships better than Linear Regression. \
                 Log-transformation was applied to reduce skewness."
                    .to_string(),
                "Better handling of categorical variables and reduced overfitting through \
                 ensemble learning."
                    .to_string(),
            ]
        } else {
            summary.notes.clone()
        };

        Self {
            algorithm,
            target,
            features,
            trees: (summary.trees > 0).then_some(summary.trees),
            metrics,
            notes,
        }
    }
}

pub fn model_insights(ui: &mut Ui, summary: &ModelSummary, config: &DashboardConfig) {
    let about = ModelDescription::from_summary(summary);

    ui.strong("🧠 Model Insights");
    ui.add_space(6.0);

    bullet(ui, "Model Used", &about.algorithm);
    bullet(ui, "Target Variable", &about.target);
    bullet(ui, "Input Features", &about.features);
    if let Some(trees) = about.trees {
        bullet(ui, "Trees", &trees.to_string());
    }

    ui.label(RichText::new("• Performance Metrics:").italics());
    ui.indent("metrics", |ui: &mut Ui| {
        for (name, value) in &about.metrics {
            ui.label(format!("◦ {name}: {value}"));
        }
    });
    for note in &about.notes {
        bullet(ui, "Note", note);
    }

    ui.add_space(10.0);
    ui.label(
        RichText::new(format!(
            "Charts treat the Price column as log-scaled when its maximum is below {}. \
             This is a rule of thumb and can misjudge datasets of small natural prices.",
            config.price_scale.threshold
        ))
        .small()
        .weak(),
    );
}

fn bullet(ui: &mut Ui, label: &str, text: &str) {
    ui.horizontal_wrapped(|ui: &mut Ui| {
        ui.label(RichText::new(format!("• {label}:")).italics());
        ui.label(text);
    });
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_empty_summary_falls_back_to_stock_text() {
        let about = ModelDescription::from_summary(&ModelSummary::default());
        assert_eq!(about.algorithm, "Random Forest Regressor");
        assert_eq!(about.target, "Log of Selling Price");
        assert!(about.features.starts_with("Brand, Model Name"));
        assert_eq!(about.metrics[0], ("MAE".to_string(), "₹2.9 Lakh".to_string()));
        assert_eq!(about.trees, None);
        assert_eq!(about.notes.len(), 2);
    }

    #[test]
    fn test_metadata_overrides_fallbacks() {
        let summary = ModelSummary {
            algorithm: Some("Gradient Boosting".to_string()),
            target: "Selling Price".to_string(),
            feature_names: vec!["Brand".to_string(), "Year".to_string()],
            trees: 3,
            metrics: BTreeMap::from([("R2".to_string(), "0.91".to_string())]),
            notes: vec!["trained on 2023 listings".to_string()],
        };
        let about = ModelDescription::from_summary(&summary);
        assert_eq!(about.algorithm, "Gradient Boosting");
        assert_eq!(about.features, "Brand, Year");
        assert_eq!(about.trees, Some(3));
        assert_eq!(about.metrics, vec![("R2".to_string(), "0.91".to_string())]);
        assert_eq!(about.notes, vec!["trained on 2023 listings".to_string()]);
    }
}
