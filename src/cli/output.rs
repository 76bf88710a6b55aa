use ansi_term::Colour;

use crate::classify::Category;

/// Renders a duration the way it reads on a dashboard: biggest two units.
pub fn format_duration(secs: i64) -> String {
    let hours = secs / 3600;
    let minutes = secs % 3600 / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

pub fn paint_category(category: Category) -> ansi_term::ANSIString<'static> {
    let colour = match category {
        Category::Learning => Colour::Green,
        Category::Productive => Colour::Cyan,
        Category::Distraction => Colour::Red,
    };
    colour.paint(category.to_string())
}
