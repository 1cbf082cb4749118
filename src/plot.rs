//! Comparison figures
//!
//! One 2×2 PNG per experiment:
//!
//! ```text
//! ┌──────────────────────────┬──────────────────────────┐
//! │ command proportions      │ inter-arrival density    │
//! ├──────────────────────────┼──────────────────────────┤
//! │ operations per second    │ key access CDF           │
//! └──────────────────────────┴──────────────────────────┘
//! ```
//!
//! Panel data is prepared by plain functions so it can be checked without a
//! font stack; the `draw_*` functions only turn it into pixels.

use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::info;

use crate::stats::LogBins;
use crate::trace::TraceTable;

const FONT: &str = "sans-serif";
const TITLE_FONT_SIZE: u32 = 30;
const PANEL_TITLE_FONT_SIZE: u32 = 24;
const AXIS_FONT_SIZE: u32 = 18;
const LABEL_FONT_SIZE: u32 = 15;
const NO_DATA: &str = "No data to plot";

/// Which trace of an experiment a series belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceRole {
    Initial,
    Generated,
    Received,
}

impl TraceRole {
    pub fn label(&self) -> &'static str {
        match self {
            TraceRole::Initial => "Initial",
            TraceRole::Generated => "Generated",
            TraceRole::Received => "Received",
        }
    }

    fn color(&self) -> RGBColor {
        match self {
            TraceRole::Initial => RGBColor(31, 119, 180),
            TraceRole::Generated => RGBColor(255, 127, 14),
            TraceRole::Received => RGBColor(44, 160, 44),
        }
    }

    fn line_style(&self) -> ShapeStyle {
        match self {
            TraceRole::Initial => self.color().mix(0.7).stroke_width(2),
            TraceRole::Generated => self.color().stroke_width(3),
            TraceRole::Received => self.color().mix(0.9).stroke_width(3),
        }
    }
}

/// A trace slot; `None` when the file was missing or unusable
pub type RoleTrace<'a> = (TraceRole, Option<&'a TraceTable>);

fn non_empty<'a>(traces: &[RoleTrace<'a>]) -> Vec<(TraceRole, &'a TraceTable)> {
    traces
        .iter()
        .filter_map(|&(role, table)| table.filter(|t| !t.is_empty()).map(|t| (role, t)))
        .collect()
}

/// Share of each command per trace, over the union of commands
#[derive(Debug, Clone, PartialEq)]
pub struct CommandProportions {
    pub categories: Vec<String>,
    pub series: Vec<(TraceRole, Vec<f64>)>,
}

pub fn command_proportions(traces: &[RoleTrace<'_>]) -> Option<CommandProportions> {
    let valid = non_empty(traces);
    if valid.is_empty() {
        return None;
    }

    let per_trace: Vec<(TraceRole, HashMap<String, u64>, u64)> = valid
        .iter()
        .map(|(role, table)| {
            let counts: HashMap<String, u64> = table.command_counts().into_iter().collect();
            let total = counts.values().sum();
            (*role, counts, total)
        })
        .collect();

    let categories: Vec<String> = per_trace
        .iter()
        .flat_map(|(_, counts, _)| counts.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let series = per_trace
        .iter()
        .map(|(role, counts, total)| {
            let shares = categories
                .iter()
                .map(|cmd| counts.get(cmd).copied().unwrap_or(0) as f64 / *total as f64)
                .collect();
            (*role, shares)
        })
        .collect();

    Some(CommandProportions { categories, series })
}

/// Density histograms of positive inter-arrival gaps on shared log bins
#[derive(Debug, Clone)]
pub struct InterArrivalDensity {
    pub bins: LogBins,
    pub series: Vec<(TraceRole, Vec<f64>)>,
}

pub fn inter_arrival_density(traces: &[RoleTrace<'_>]) -> Option<InterArrivalDensity> {
    let gaps: Vec<(TraceRole, Vec<f64>)> = non_empty(traces)
        .into_iter()
        .map(|(role, table)| (role, table.positive_inter_arrivals_ms()))
        .collect();

    let bins = LogBins::spanning(gaps.iter().flat_map(|(_, g)| g.iter().copied()));
    let series: Vec<(TraceRole, Vec<f64>)> = gaps
        .iter()
        .filter(|(_, g)| !g.is_empty())
        .map(|(role, g)| (*role, bins.density(g)))
        .collect();

    if series.is_empty() {
        return None;
    }
    Some(InterArrivalDensity { bins, series })
}

/// Operations per whole second since each trace's own start
#[derive(Debug, Clone, PartialEq)]
pub struct OpsPerSecond {
    /// Last second shown; every series has `max_duration + 1` points
    pub max_duration: u64,
    pub series: Vec<(TraceRole, Vec<u64>)>,
}

pub fn ops_per_second(traces: &[RoleTrace<'_>]) -> Option<OpsPerSecond> {
    let valid: Vec<(TraceRole, &TraceTable)> = non_empty(traces)
        .into_iter()
        .filter(|(_, t)| t.len() > 1)
        .collect();
    if valid.is_empty() {
        return None;
    }

    let max_duration = valid
        .iter()
        .map(|(_, t)| t.duration_secs() as u64)
        .max()
        .unwrap_or(0)
        .max(1);

    let series = valid
        .iter()
        .map(|(role, table)| {
            let start = table.start_time().unwrap_or(0.0);
            let mut buckets = vec![0u64; max_duration as usize + 1];
            for row in table.rows() {
                let second = (row.timestamp - start) as usize;
                if let Some(slot) = buckets.get_mut(second) {
                    *slot += 1;
                }
            }
            (*role, buckets)
        })
        .collect();

    Some(OpsPerSecond {
        max_duration,
        series,
    })
}

/// Cumulative share of accesses against normalized key rank (most popular first)
pub fn access_cdf(traces: &[RoleTrace<'_>]) -> Option<Vec<(TraceRole, Vec<(f64, f64)>)>> {
    let curves: Vec<(TraceRole, Vec<(f64, f64)>)> = non_empty(traces)
        .into_iter()
        .map(|(role, table)| {
            let counts = table.target_counts();
            let total: u64 = counts.iter().map(|(_, c)| c).sum();
            let n = counts.len() as f64;
            let mut cumulative = 0u64;
            let points = counts
                .iter()
                .enumerate()
                .map(|(i, (_, c))| {
                    cumulative += c;
                    ((i + 1) as f64 / n, cumulative as f64 / total as f64)
                })
                .collect();
            (role, points)
        })
        .collect();

    if curves.is_empty() {
        return None;
    }
    Some(curves)
}

/// Render the 2×2 comparison figure for one experiment to `path`.
pub fn render_comparison(
    traces: &[RoleTrace<'_>],
    experiment_name: &str,
    path: &Path,
    size: (u32, u32),
) -> Result<()> {
    info!("Rendering combined figure for experiment: {}", experiment_name);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let body = root.titled(experiment_name, (FONT, TITLE_FONT_SIZE))?;
    let panels = body.split_evenly((2, 2));

    match command_proportions(traces) {
        Some(data) => draw_command_panel(&root, &panels[0], &data)?,
        None => draw_placeholder(&panels[0])?,
    }
    match inter_arrival_density(traces) {
        Some(data) => draw_inter_arrival_panel(&panels[1], &data)?,
        None => draw_placeholder(&panels[1])?,
    }
    match ops_per_second(traces) {
        Some(data) => draw_ops_panel(&panels[2], &data)?,
        None => draw_placeholder(&panels[2])?,
    }
    match access_cdf(traces) {
        Some(data) => draw_cdf_panel(&panels[3], &data)?,
        None => draw_placeholder(&panels[3])?,
    }

    root.present()?;
    info!("Saved: {}", path.display());
    Ok(())
}

fn draw_placeholder<DB>(area: &DrawingArea<DB, Shift>) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (w, h) = area.dim_in_pixel();
    let style = TextStyle::from((FONT, AXIS_FONT_SIZE).into_font())
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    area.draw_text(NO_DATA, &style, ((w / 2) as i32, (h / 2) as i32))?;
    Ok(())
}

/// Grouped bars. Category names are written on `root` in absolute pixels
/// under each group, since the x axis itself is numeric.
fn draw_command_panel<DB>(
    root: &DrawingArea<DB, Shift>,
    area: &DrawingArea<DB, Shift>,
    data: &CommandProportions,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let n = data.categories.len() as f64;
    let y_max = data
        .series
        .iter()
        .flat_map(|(_, s)| s.iter().copied())
        .fold(0.0_f64, f64::max)
        .max(0.01)
        * 1.1;

    let mut chart = ChartBuilder::on(area)
        .caption("Command Proportions", (FONT, PANEL_TITLE_FONT_SIZE))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5..(n - 0.5), 0.0..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&|_| String::new())
        .x_desc("command")
        .y_desc("Proportion")
        .axis_desc_style((FONT, AXIS_FONT_SIZE))
        .label_style((FONT, LABEL_FONT_SIZE))
        .draw()?;

    let group_width = 0.8;
    let bar_width = group_width / data.series.len() as f64;
    for (j, (role, shares)) in data.series.iter().enumerate() {
        let color = role.color();
        let offset = -group_width / 2.0 + j as f64 * bar_width;
        chart
            .draw_series(shares.iter().enumerate().map(|(i, &share)| {
                let x0 = i as f64 + offset;
                Rectangle::new([(x0, 0.0), (x0 + bar_width, share)], color.filled())
            }))?
            .label(role.label())
            .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 14, y + 6)], color.filled()));
        chart.draw_series(shares.iter().enumerate().map(|(i, &share)| {
            let x0 = i as f64 + offset;
            Rectangle::new([(x0, 0.0), (x0 + bar_width, share)], BLACK.stroke_width(1))
        }))?;
    }

    let label_style = TextStyle::from((FONT, LABEL_FONT_SIZE).into_font())
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Top));
    for (i, category) in data.categories.iter().enumerate() {
        let (x, y) = chart.backend_coord(&(i as f64, 0.0));
        root.draw_text(category, &label_style, (x, y + 6))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font((FONT, LABEL_FONT_SIZE))
        .draw()?;
    Ok(())
}

/// Reference trace as filled bars, the others as step outlines.
fn draw_inter_arrival_panel<DB>(
    area: &DrawingArea<DB, Shift>,
    data: &InterArrivalDensity,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let edges = data.bins.edges();
    let (lo, hi) = match (edges.first(), edges.last()) {
        (Some(&lo), Some(&hi)) if hi > lo => (lo, hi),
        _ => return draw_placeholder(area),
    };
    let y_max = data
        .series
        .iter()
        .flat_map(|(_, s)| s.iter().copied())
        .fold(0.0_f64, f64::max);
    let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

    let mut chart = ChartBuilder::on(area)
        .caption("Inter-arrival Time Distribution (Log Scale)", (FONT, PANEL_TITLE_FONT_SIZE))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d((lo..hi).log_scale(), 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Time (ms)")
        .y_desc("Probability Density")
        .x_label_formatter(&|x| format!("{:.0e}", x))
        .y_label_formatter(&|y| format!("{:.2e}", y))
        .axis_desc_style((FONT, AXIS_FONT_SIZE))
        .label_style((FONT, LABEL_FONT_SIZE))
        .draw()?;

    for (role, density) in &data.series {
        let color = role.color();
        if *role == TraceRole::Initial {
            chart
                .draw_series(edges.windows(2).zip(density).map(|(w, &d)| {
                    Rectangle::new([(w[0], 0.0), (w[1], d)], color.mix(0.6).filled())
                }))?
                .label(role.label())
                .legend(move |(x, y)| {
                    Rectangle::new([(x, y - 6), (x + 14, y + 6)], color.mix(0.6).filled())
                });
        } else {
            let mut steps = Vec::with_capacity(density.len() * 2 + 2);
            steps.push((lo, 0.0));
            for (w, &d) in edges.windows(2).zip(density) {
                steps.push((w[0], d));
                steps.push((w[1], d));
            }
            steps.push((hi, 0.0));
            let style = color.stroke_width(2);
            chart
                .draw_series(LineSeries::new(steps, style))?
                .label(role.label())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font((FONT, LABEL_FONT_SIZE))
        .draw()?;
    Ok(())
}

fn draw_ops_panel<DB>(area: &DrawingArea<DB, Shift>, data: &OpsPerSecond) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let y_max = data
        .series
        .iter()
        .flat_map(|(_, s)| s.iter().copied())
        .max()
        .unwrap_or(0)
        .max(1) as f64
        * 1.1;

    let mut chart = ChartBuilder::on(area)
        .caption("Operations per Second", (FONT, PANEL_TITLE_FONT_SIZE))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d(0.0..data.max_duration as f64, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Time (seconds)")
        .y_desc("Number of Operations")
        .axis_desc_style((FONT, AXIS_FONT_SIZE))
        .label_style((FONT, LABEL_FONT_SIZE))
        .draw()?;

    for (role, buckets) in &data.series {
        let style = role.line_style();
        let points = buckets
            .iter()
            .enumerate()
            .map(|(sec, &count)| (sec as f64, count as f64));
        chart
            .draw_series(LineSeries::new(points, style))?
            .label(role.label())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font((FONT, LABEL_FONT_SIZE))
        .draw()?;
    Ok(())
}

/// Includes the 80/20 guide lines (x = 0.2, y = 0.8).
fn draw_cdf_panel<DB>(
    area: &DrawingArea<DB, Shift>,
    curves: &[(TraceRole, Vec<(f64, f64)>)],
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let mut chart = ChartBuilder::on(area)
        .caption("Key Access CDF", (FONT, PANEL_TITLE_FONT_SIZE))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..1.0, 0.0..1.0)?;

    chart
        .configure_mesh()
        .light_line_style(BLACK.mix(0.1))
        .bold_line_style(BLACK.mix(0.25))
        .x_desc("Share of Keys (by Popularity)")
        .y_desc("Cumulative Share of Accesses")
        .axis_desc_style((FONT, AXIS_FONT_SIZE))
        .label_style((FONT, LABEL_FONT_SIZE))
        .draw()?;

    let guide = RGBColor(128, 128, 128).stroke_width(1);
    chart.draw_series(LineSeries::new(vec![(0.0, 0.8), (1.0, 0.8)], guide))?;
    chart.draw_series(LineSeries::new(vec![(0.2, 0.0), (0.2, 1.0)], guide))?;

    for (role, points) in curves {
        let style = role.line_style();
        chart
            .draw_series(LineSeries::new(points.iter().copied(), style))?
            .label(role.label())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font((FONT, LABEL_FONT_SIZE))
        .draw()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TraceRecord;

    fn trace(entries: &[(f64, &str, &str)]) -> TraceTable {
        TraceTable::from_records(
            entries
                .iter()
                .map(|&(ts, cmd, key)| TraceRecord {
                    timestamp: ts,
                    command: cmd.to_string(),
                    target: key.to_string(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_no_traces_means_no_panels() {
        let traces: Vec<RoleTrace<'_>> =
            vec![(TraceRole::Initial, None), (TraceRole::Generated, None)];
        assert!(command_proportions(&traces).is_none());
        assert!(inter_arrival_density(&traces).is_none());
        assert!(ops_per_second(&traces).is_none());
        assert!(access_cdf(&traces).is_none());
    }

    #[test]
    fn test_command_proportions_union() {
        let initial = trace(&[(0.0, "GET", "a"), (1.0, "GET", "a"), (2.0, "SET", "b")]);
        let generated = trace(&[(0.0, "GET", "a"), (1.0, "DEL", "a")]);
        let data = command_proportions(&[
            (TraceRole::Initial, Some(&initial)),
            (TraceRole::Generated, Some(&generated)),
            (TraceRole::Received, None),
        ])
        .unwrap();
        assert_eq!(data.categories, vec!["DEL", "GET", "SET"]);
        assert_eq!(data.series.len(), 2);
        assert_eq!(data.series[0].1, vec![0.0, 0.5, 0.5]);
        assert_eq!(data.series[1].1, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_inter_arrival_density_shares_bins() {
        let a = trace(&[(0.0, "GET", "a"), (0.001, "GET", "a"), (0.011, "GET", "a")]);
        let b = trace(&[(0.0, "GET", "a"), (0.1, "GET", "a")]);
        let data = inter_arrival_density(&[
            (TraceRole::Initial, Some(&a)),
            (TraceRole::Generated, Some(&b)),
        ])
        .unwrap();
        let edges = data.bins.edges();
        assert!((edges[0] - 1.0).abs() < 1e-6);
        assert!((edges[edges.len() - 1] - 100.0).abs() < 1e-6);
        assert_eq!(data.series.len(), 2);
        assert!(data.series.iter().all(|(_, d)| d.len() == edges.len() - 1));
    }

    #[test]
    fn test_ops_per_second_zero_fills_to_longest_trace() {
        let short = trace(&[
            (10.0, "GET", "a"),
            (10.2, "GET", "a"),
            (10.7, "GET", "a"),
            (11.5, "GET", "a"),
        ]);
        let long = trace(&[(50.0, "GET", "a"), (50.1, "GET", "a"), (53.9, "GET", "a")]);
        let data = ops_per_second(&[
            (TraceRole::Initial, Some(&short)),
            (TraceRole::Generated, Some(&long)),
        ])
        .unwrap();
        // long keeps rows at 50.1 and 53.9: duration 3.8s -> 3
        assert_eq!(data.max_duration, 3);
        assert_eq!(data.series[0].1, vec![2, 1, 0, 0]);
        assert_eq!(data.series[1].1, vec![1, 0, 0, 1]);
    }

    #[test]
    fn test_ops_per_second_minimum_duration() {
        let burst = trace(&[(1.0, "GET", "a"), (1.1, "GET", "a"), (1.2, "GET", "a")]);
        let data = ops_per_second(&[(TraceRole::Initial, Some(&burst))]).unwrap();
        assert_eq!(data.max_duration, 1);
        assert_eq!(data.series[0].1, vec![2, 0]);
    }

    #[test]
    fn test_access_cdf_reaches_one() {
        let t = trace(&[
            (0.0, "GET", "x"),
            (1.0, "GET", "hot"),
            (2.0, "GET", "hot"),
            (3.0, "GET", "hot"),
            (4.0, "GET", "cold"),
        ]);
        let curves = access_cdf(&[(TraceRole::Initial, Some(&t))]).unwrap();
        let points = &curves[0].1;
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], (0.5, 0.75));
        assert_eq!(points[1], (1.0, 1.0));
    }
}
