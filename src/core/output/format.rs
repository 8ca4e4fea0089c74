//! Text and JSON rendering of command results.
//!
//! Text output is meant for people reading a terminal; JSON output is one
//! pretty-printed document per command, meant for scripts.

use super::view::{self, UNTITLED};
use crate::config::ConfigEntry;
use crate::fields::{self, REQUIRED_COLUMNS};
use crate::models::{OutputFormat, WorkItem, WorkItemComment, WorkItemDetails, WorkItemId};
use crate::utils::{ellipsize, html_to_text};
use serde::Serialize;
use std::io::{self, Write};

/// Longest title shown on a list card.
const CARD_TITLE_CHARS: usize = 100;

/// Rows of the detail grid, in display order.
const DETAIL_GRID: [(&str, &str); 9] = [
    ("Type", "System.WorkItemType"),
    ("Assigned To", "System.AssignedTo"),
    ("Priority", "Microsoft.VSTS.Common.Priority"),
    ("Tags", "System.Tags"),
    ("Area Path", "System.AreaPath"),
    ("Iteration", "System.IterationPath"),
    ("Created By", "System.CreatedBy"),
    ("Created", "System.CreatedDate"),
    ("Changed", "System.ChangedDate"),
];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WorkItemList<'a> {
    count: usize,
    columns: &'a [String],
    work_items: &'a [WorkItem],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetailsDocument<'a> {
    work_item: &'a WorkItem,
    comments: &'a [WorkItemComment],
    state_options: Vec<String>,
}

#[derive(Serialize)]
struct Message<'a> {
    message: &'a str,
}

#[derive(Serialize)]
struct ColumnInfo<'a> {
    reference: &'a str,
    label: &'a str,
    required: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CommentAdded<'a> {
    work_item_id: WorkItemId,
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StateChanged<'a> {
    work_item_id: WorkItemId,
    state: &'a str,
}

/// Writer that formats output according to the selected format.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
}

impl<W: Write> OutputWriter<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self { writer, format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn writeln(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.writer, "{}", text)
    }

    fn write_json<T: Serialize>(&mut self, value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        self.writeln(&json)
    }

    /// Prints the list as cards: id and title, state, then the other selected columns.
    pub fn write_work_items(&mut self, items: &[WorkItem], columns: &[String]) -> io::Result<()> {
        if self.format == OutputFormat::Json {
            return self.write_json(&WorkItemList {
                count: items.len(),
                columns,
                work_items: items,
            });
        }

        if items.is_empty() {
            return self.writeln("No work items match your filters.");
        }

        for (index, item) in items.iter().enumerate() {
            if index > 0 {
                self.writeln("")?;
            }
            let title = item.title().filter(|t| !t.trim().is_empty()).unwrap_or(UNTITLED);
            self.writeln(&format!("#{} {}", item.id(), ellipsize(title, CARD_TITLE_CHARS)))?;
            self.writeln(&format!(
                "  State: {}",
                view::display_value("System.State", item.field("System.State"))
            ))?;
            for reference in columns
                .iter()
                .filter(|c| !REQUIRED_COLUMNS.contains(&c.as_str()))
            {
                self.writeln(&format!(
                    "  {}: {}",
                    fields::label_for(reference),
                    view::display_value(reference, item.field(reference))
                ))?;
            }
        }

        let noun = if items.len() == 1 { "work item" } else { "work items" };
        self.writeln("")?;
        self.writeln(&format!("{} {}", items.len(), noun))
    }

    /// Prints the detail view of one item.
    pub fn write_details(&mut self, details: &WorkItemDetails) -> io::Result<()> {
        let item = &details.work_item;
        let state_options = fields::state_options(item.state());

        if self.format == OutputFormat::Json {
            return self.write_json(&DetailsDocument {
                work_item: item,
                comments: &details.comments,
                state_options,
            });
        }

        let title = item.title().filter(|t| !t.trim().is_empty()).unwrap_or(UNTITLED);
        self.writeln(&format!("#{} {}", item.id(), title))?;
        self.writeln(&format!(
            "State: {}",
            view::display_value("System.State", item.field("System.State"))
        ))?;

        self.writeln("")?;
        self.writeln("Details")?;
        let width = DETAIL_GRID.iter().map(|(label, _)| label.len()).max().unwrap_or(0) + 1;
        for (label, reference) in DETAIL_GRID {
            self.writeln(&format!(
                "  {:<width$} {}",
                format!("{}:", label),
                view::display_value(reference, item.field(reference)),
                width = width
            ))?;
        }

        self.writeln("")?;
        self.writeln("Description")?;
        match item.description() {
            Some(html) => {
                for line in html_to_text(html) {
                    self.writeln(format!("  {}", line).trim_end())?;
                }
            }
            None => self.writeln("  No description")?,
        }

        self.writeln("")?;
        let current = item.state();
        let options: Vec<String> = state_options
            .iter()
            .map(|option| {
                if Some(option.as_str()) == current {
                    format!("[{}]", option)
                } else {
                    option.clone()
                }
            })
            .collect();
        self.writeln(&format!("State options: {}", options.join(" | ")))?;

        self.writeln("")?;
        if details.comments.is_empty() {
            self.writeln("Comments")?;
            return self.writeln("  No comments yet.");
        }
        self.writeln(&format!("Comments ({})", details.comments.len()))?;
        for comment in &details.comments {
            self.write_comment_text(comment)?;
        }
        Ok(())
    }

    fn write_comment_text(&mut self, comment: &WorkItemComment) -> io::Result<()> {
        let edited = if comment.modified_date.is_some_and(|m| m != comment.created_date) {
            " (edited)"
        } else {
            ""
        };
        self.writeln(&format!(
            "  {} · {}{}",
            comment.created_by.display_name,
            view::format_timestamp(&comment.created_date),
            edited
        ))?;
        for line in html_to_text(&comment.text) {
            self.writeln(format!("    {}", line).trim_end())?;
        }
        Ok(())
    }

    /// Confirms a state change. The service response is not read back.
    pub fn write_state_changed(&mut self, id: WorkItemId, state: &str) -> io::Result<()> {
        if self.format == OutputFormat::Json {
            return self.write_json(&StateChanged {
                work_item_id: id,
                state,
            });
        }
        self.writeln(&format!("#{} is now {}", id, state))
    }

    pub fn write_comment_added(&mut self, id: WorkItemId, text: &str) -> io::Result<()> {
        if self.format == OutputFormat::Json {
            return self.write_json(&CommentAdded {
                work_item_id: id,
                text,
            });
        }
        self.writeln(&format!("Added comment to #{}", id))
    }

    pub fn write_message(&mut self, message: &str) -> io::Result<()> {
        if self.format == OutputFormat::Json {
            return self.write_json(&Message { message });
        }
        self.writeln(message)
    }

    /// Prints resolved configuration values with their origin.
    pub fn write_config(&mut self, entries: &[ConfigEntry]) -> io::Result<()> {
        if self.format == OutputFormat::Json {
            return self.write_json(&entries);
        }
        let width = entries.iter().map(|e| e.key.len()).max().unwrap_or(0);
        for entry in entries {
            let value = entry.value.as_deref().unwrap_or("(not set)");
            match &entry.origin {
                Some(origin) => self.writeln(&format!(
                    "{:<width$}  {}  [{}]",
                    entry.key,
                    value,
                    origin,
                    width = width
                ))?,
                None => self.writeln(&format!("{:<width$}  {}", entry.key, value, width = width))?,
            }
        }
        Ok(())
    }

    /// Prints the column selection.
    pub fn write_columns(&mut self, columns: &[String]) -> io::Result<()> {
        let infos: Vec<ColumnInfo<'_>> = columns
            .iter()
            .map(|reference| ColumnInfo {
                reference,
                label: fields::label_for(reference),
                required: fields::is_required_column(reference),
            })
            .collect();

        if self.format == OutputFormat::Json {
            return self.write_json(&infos);
        }
        for info in infos {
            let marker = if info.required { " (required)" } else { "" };
            self.writeln(&format!("{} ({}){}", info.label, info.reference, marker))?;
        }
        Ok(())
    }
}
