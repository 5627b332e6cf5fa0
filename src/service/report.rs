//! Console summary printed after a run

use std::fmt::Write as _;

use super::sync::SyncStats;
use crate::data::{CollectionStats, FieldCount, FilterOptions};

/// Groups shown per aggregate in the console summary
pub const SUMMARY_GROUPS: usize = 5;

const RULE_WIDTH: usize = 50;

fn write_groups(out: &mut String, title: &str, groups: &[FieldCount]) {
    if groups.is_empty() {
        return;
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{title}:");
    for group in groups.iter().take(SUMMARY_GROUPS) {
        let _ = writeln!(
            out,
            "  {}: {} exercises",
            group.value.as_deref().unwrap_or("(none)"),
            group.count
        );
    }
}

/// Collection statistics block
///
/// Empty when `collection` is empty, so a failed aggregate never prints a
/// misleading zero.
pub fn render_collection_stats(collection: &CollectionStats) -> String {
    let mut out = String::new();
    if collection.is_empty() {
        return out;
    }

    let _ = writeln!(out, "Collection Statistics:");
    let _ = writeln!(out, "Total exercises: {}", collection.total_count);
    write_groups(&mut out, "Top body parts", &collection.top_body_parts);
    write_groups(&mut out, "Top equipment", &collection.top_equipment);
    out
}

/// Full end-of-sync banner
pub fn render_summary(stats: &SyncStats, collection: &CollectionStats) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out);
    let _ = writeln!(out, "{rule}");
    if stats.aborted {
        let _ = writeln!(out, "EXERCISE FETCH STOPPED AFTER REPEATED FAILURES");
    } else {
        let _ = writeln!(out, "EXERCISE FETCH COMPLETE");
    }
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Total exercises fetched: {}", stats.total_fetched);
    let _ = writeln!(out, "Total exercises saved/updated: {}", stats.total_saved);
    match stats.database_count {
        Some(count) => {
            let _ = writeln!(out, "Total exercises in database: {count}");
        }
        None => {
            let _ = writeln!(out, "Total exercises in database: unknown");
        }
    }

    let collection_block = render_collection_stats(collection);
    if !collection_block.is_empty() {
        let _ = writeln!(out);
        out.push_str(&collection_block);
    }

    out
}

/// Values accepted by the `filter` command, one section per criterion
pub fn render_filter_options(options: &FilterOptions) -> String {
    let mut out = String::new();
    for (title, values) in [
        ("Body parts", &options.body_parts),
        ("Equipment", &options.equipment),
        ("Targets", &options.targets),
    ] {
        let _ = writeln!(out, "{title} ({}):", values.len());
        for value in values {
            let _ = writeln!(out, "  {value}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(value: &str, count: u64) -> FieldCount {
        FieldCount {
            value: Some(value.to_string()),
            count,
        }
    }

    #[test]
    fn summary_lists_totals_and_top_groups() {
        let stats = SyncStats {
            total_fetched: 60,
            total_saved: 58,
            database_count: Some(60),
            pages_fetched: 3,
            ..Default::default()
        };
        let collection = CollectionStats {
            total_count: 60,
            top_body_parts: (0..8).map(|i| group(&format!("part-{i}"), 10 - i)).collect(),
            top_equipment: vec![group("body weight", 40), group("barbell", 20)],
        };

        let text = render_summary(&stats, &collection);

        assert!(text.contains("EXERCISE FETCH COMPLETE"));
        assert!(text.contains("Total exercises fetched: 60"));
        assert!(text.contains("Total exercises saved/updated: 58"));
        assert!(text.contains("Total exercises in database: 60"));
        assert!(text.contains("  part-0: 10 exercises"));
        assert!(text.contains("  part-4: 6 exercises"));
        assert!(!text.contains("part-5"));
        assert!(text.contains("  body weight: 40 exercises"));
    }

    #[test]
    fn summary_without_collection_stats_omits_section() {
        let stats = SyncStats {
            aborted: true,
            ..Default::default()
        };

        let text = render_summary(&stats, &CollectionStats::default());

        assert!(text.contains("STOPPED AFTER REPEATED FAILURES"));
        assert!(text.contains("Total exercises in database: unknown"));
        assert!(!text.contains("Collection Statistics"));
    }

    #[test]
    fn missing_group_value_is_labelled() {
        let collection = CollectionStats {
            total_count: 2,
            top_body_parts: vec![FieldCount {
                value: None,
                count: 2,
            }],
            top_equipment: Vec::new(),
        };

        let text = render_collection_stats(&collection);

        assert!(text.contains("  (none): 2 exercises"));
        assert!(!text.contains("Top equipment"));
    }

    #[test]
    fn filter_options_list_every_section() {
        let options = FilterOptions {
            body_parts: vec!["back".to_string(), "chest".to_string()],
            equipment: vec!["barbell".to_string()],
            targets: Vec::new(),
        };

        let text = render_filter_options(&options);

        assert!(text.contains("Body parts (2):\n  back\n  chest\n"));
        assert!(text.contains("Equipment (1):\n  barbell\n"));
        assert!(text.ends_with("Targets (0):\n"));
    }
}
