//! The `patisserie paths` and `patisserie techniques` commands.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use comfy_table::{Cell, Table};

use patisserie_core::catalog::{filter, sort, FilterCriteria, Listing, SortDirection, SortKey};
use patisserie_core::curriculum::Difficulty;

use super::Session;
use crate::FilterArgs;

impl FilterArgs {
    fn criteria(&self) -> Result<FilterCriteria> {
        let difficulty = self
            .difficulty
            .as_deref()
            .map(str::parse::<Difficulty>)
            .transpose()
            .map_err(|e| anyhow!(e))?;

        Ok(FilterCriteria {
            search: self.search.clone(),
            category: self.category.clone(),
            difficulty,
            tags: self.tags.clone(),
            min_rating: self.min_rating,
            max_rating: self.max_rating,
            min_duration_minutes: self.min_duration,
            max_duration_minutes: self.max_duration,
            featured: self.featured.then_some(true),
            certificate: self.certificate.then_some(true),
            ..FilterCriteria::default()
        })
    }

    fn ordering(&self) -> Result<(SortKey, SortDirection)> {
        let key = self.sort.parse::<SortKey>().map_err(|e| anyhow!(e))?;
        let direction = if self.desc {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        Ok((key, direction))
    }

    fn select<'a, T: Listing>(&self, items: &'a [T]) -> Result<Vec<&'a T>> {
        let criteria = self.criteria()?;
        let (key, direction) = self.ordering()?;
        Ok(sort(filter(items, &criteria), key, direction))
    }
}

pub fn paths(args: FilterArgs, config_path: Option<PathBuf>) -> Result<()> {
    let session = Session::load(config_path)?;
    let selected = args.select(&session.library.paths)?;
    if selected.is_empty() {
        println!("No learning paths match.");
        return Ok(());
    }

    let tracker = session.tracker();
    let state = tracker.state();

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "Title", "Difficulty", "Duration", "Rating", "Students", "Status",
    ]);
    for path in selected {
        let status = match state.path_progress.get(&path.id) {
            Some(progress) => format!("{} ({}%)", progress.status, progress.completion_percent),
            None if tracker.can_access_path(&path.id) => "available".to_string(),
            None => "locked".to_string(),
        };
        table.add_row(vec![
            Cell::new(&path.id),
            Cell::new(&path.title),
            Cell::new(path.difficulty),
            Cell::new(&path.duration),
            Cell::new(format!("{:.1}", path.rating)),
            Cell::new(path.student_count),
            Cell::new(status),
        ]);
    }
    println!("{table}");

    Ok(())
}

pub fn techniques(args: FilterArgs, config_path: Option<PathBuf>) -> Result<()> {
    let session = Session::load(config_path)?;
    let selected = args.select(&session.library.techniques)?;
    if selected.is_empty() {
        println!("No techniques match.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "Name", "Category", "Difficulty", "Duration", "Rating", "Quiz",
    ]);
    for technique in selected {
        table.add_row(vec![
            Cell::new(&technique.id),
            Cell::new(&technique.name),
            Cell::new(&technique.category),
            Cell::new(technique.difficulty),
            Cell::new(&technique.duration),
            Cell::new(format!("{:.1}", technique.rating)),
            Cell::new(technique.quiz.as_deref().unwrap_or("-")),
        ]);
    }
    println!("{table}");

    Ok(())
}
