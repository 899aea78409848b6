use tabled::{Table, Tabled, settings::Style};

use crate::query::{DomainOverview, SearchHit};
use crate::storage::{InventionSummary, StoreStats};

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct DomainRow {
    #[tabled(rename = "")]
    icon: &'static str,
    #[tabled(rename = "Domain")]
    name: &'static str,
    #[tabled(rename = "Key")]
    key: &'static str,
    #[tabled(rename = "Inventions")]
    count: u64,
}

#[derive(Tabled)]
struct InventionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Date")]
    date: String,
}

#[derive(Tabled)]
struct SearchRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Context")]
    context: String,
}

const TITLE_WIDTH: usize = 48;
const CONTEXT_WIDTH: usize = 60;

fn render<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Cut to `max` characters, marking the cut with `…`
fn clip(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let mut clipped: String = flat.chars().take(max.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

pub fn stats_table(stats: &StoreStats, backend: &str) -> String {
    let rows = vec![
        MetricRow {
            metric: "Total inventions".to_string(),
            value: stats.total_inventions.to_string(),
        },
        MetricRow {
            metric: "Active domains".to_string(),
            value: stats.domains_active.to_string(),
        },
        MetricRow {
            metric: "Storage".to_string(),
            value: backend.to_string(),
        },
    ];
    render(&rows)
}

pub fn domains_table(domains: &[DomainOverview]) -> String {
    let rows: Vec<_> = domains
        .iter()
        .map(|d| DomainRow {
            icon: d.info.icon,
            name: d.info.name,
            key: d.key,
            count: d.count,
        })
        .collect();
    render(&rows)
}

pub fn inventions_table(inventions: &[InventionSummary]) -> String {
    let rows: Vec<_> = inventions
        .iter()
        .map(|inv| InventionRow {
            id: inv.invention_id.clone(),
            domain: inv.domain_name.clone(),
            title: clip(&inv.title, TITLE_WIDTH),
            date: inv.date.to_string(),
        })
        .collect();
    render(&rows)
}

pub fn search_table(hits: &[SearchHit]) -> String {
    let rows: Vec<_> = hits
        .iter()
        .map(|hit| SearchRow {
            id: hit.invention_id.clone(),
            domain: hit.domain_name.clone(),
            title: clip(&hit.title, TITLE_WIDTH),
            context: clip(&hit.context, CONTEXT_WIDTH),
        })
        .collect();
    render(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip() {
        assert_eq!(clip("short  title\n", 20), "short title");
        assert_eq!(clip("abcdefghij", 5), "abcd…");
    }

    #[test]
    fn test_empty_tables_render_nothing() {
        assert!(inventions_table(&[]).is_empty());
        assert!(search_table(&[]).is_empty());
    }

    #[test]
    fn test_stats_table_lists_backend() {
        let table = stats_table(&StoreStats::default(), "sqlite");
        assert!(table.contains("Total inventions"));
        assert!(table.contains("sqlite"));
    }
}
