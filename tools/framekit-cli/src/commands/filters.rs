//! List available filters.

use framekit_media_model::filter_type::FilterType;

pub fn run() -> anyhow::Result<()> {
    println!("Available filters:");
    for filter in FilterType::ALL {
        let note = if filter.is_identity() { " (default)" } else { "" };
        println!("  {filter}{note}");
    }
    Ok(())
}
