use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// `stale/total`, green when nothing is stale and red when everything is.
pub fn stale_count_cell(stale: usize, total: usize) -> Cell {
    let text = format!("{stale}/{total}");
    if stale == 0 {
        Cell::new(text).fg(TableColor::Green)
    } else if stale < total {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Red)
    }
}

pub fn last_run_cell(days_ago: Option<i64>) -> Cell {
    match days_ago {
        None => Cell::new("No Runs").fg(TableColor::Red),
        Some(days) if days > 365 => Cell::new(format!("{days}d ago")).fg(TableColor::Red),
        Some(days) => Cell::new(format!("{days}d ago")).fg(TableColor::Yellow),
    }
}

pub fn result_cell(result: Option<&str>) -> Cell {
    match result {
        Some("succeeded") => Cell::new("succeeded").fg(TableColor::Green),
        Some("failed") => Cell::new("failed").fg(TableColor::Red),
        Some(other) => Cell::new(other),
        None => Cell::new("-").fg(TableColor::DarkGrey),
    }
}
