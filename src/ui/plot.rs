use std::ops::RangeInclusive;

use eframe::egui::{Color32, RichText, Ui};
use egui_plot::{Bar, BarChart, GridMark, Legend, Line, Plot, PlotPoints};

use crate::color::{DENSITY_LINE, DISTRIBUTION_FILL, group_colors};
use crate::data::summary::PriceOverview;
use crate::data::transform::PriceScale;

const PLOT_HEIGHT: f32 = 320.0;

fn scale_note(ui: &mut Ui, scale: PriceScale) {
    if scale == PriceScale::OverflowFallback {
        ui.label(
            RichText::new("Prices could not be converted back from log scale; shown as stored.")
                .small()
                .color(Color32::YELLOW),
        );
    }
}

// ---------------------------------------------------------------------------
// Price distribution: histogram + density
// ---------------------------------------------------------------------------

pub fn price_distribution(ui: &mut Ui, overview: &PriceOverview) {
    ui.strong("Distribution of Selling Prices");
    scale_note(ui, overview.histogram_scale);

    let Some(histogram) = &overview.histogram else {
        ui.label("No finite prices to plot.");
        return;
    };

    let bars: Vec<Bar> = histogram
        .centers()
        .map(|(center, count)| {
            Bar::new(center, count as f64)
                .width(histogram.bin_width)
                .fill(DISTRIBUTION_FILL)
        })
        .collect();
    let chart = BarChart::new(bars).name("Listings").color(DISTRIBUTION_FILL);

    let density: PlotPoints = overview.density.iter().copied().collect();
    let line = Line::new(density)
        .name("Density")
        .color(DENSITY_LINE)
        .width(2.0);

    Plot::new("price_distribution")
        .legend(Legend::default())
        .height(PLOT_HEIGHT)
        .x_axis_label("Selling Price (₹)")
        .y_axis_label("Count")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(chart);
            if !overview.density.is_empty() {
                plot_ui.line(line);
            }
        });
}

// ---------------------------------------------------------------------------
// Average price by brand
// ---------------------------------------------------------------------------

pub fn brand_averages(ui: &mut Ui, overview: &PriceOverview) {
    ui.strong("Average Price by Brand");
    scale_note(ui, overview.brand_scale);

    if overview.by_brand.is_empty() {
        ui.label("No brands to plot.");
        return;
    }

    let colors = group_colors(overview.by_brand.iter().map(|g| g.label.as_str()));
    let bars: Vec<Bar> = overview
        .by_brand
        .iter()
        .zip(&colors)
        .enumerate()
        .map(|(i, (group, (label, color)))| {
            Bar::new(i as f64, group.mean)
                .name(format!("{label} ({} listings)", group.count))
                .width(0.7)
                .fill(*color)
        })
        .collect();

    let labels: Vec<String> = overview.by_brand.iter().map(|g| g.label.clone()).collect();

    Plot::new("brand_averages")
        .height(PLOT_HEIGHT)
        .y_axis_label("Avg Selling Price (₹)")
        .x_axis_formatter(move |mark: GridMark, _range: &RangeInclusive<f64>| {
            brand_tick(&labels, mark.value)
        })
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars));
        });
}

/// Brand name at integer ticks, nothing in between.
fn brand_tick(labels: &[String], value: f64) -> String {
    if value.fract() != 0.0 || value < 0.0 {
        return String::new();
    }
    labels.get(value as usize).cloned().unwrap_or_default()
}
