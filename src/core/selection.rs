use crate::config::store::ConfigStore;
use crate::core::{ClassSummary, Clock, Selection, SelectionPrompt, Storage};
use crate::domain::model::{FormEntry, FormSubmission, SelectionForm};
use crate::utils::error::Result;
use chrono::{DateTime, Local, NaiveDateTime, NaiveTime};

/// `datetime-local` input format.
pub const INPUT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Global the selection view assigns the submitted values to.
pub const SUBMISSION_GLOBAL: &str = "__masterySelection";

pub struct SelectionNegotiator<'a, S: Storage> {
    prompt: &'a dyn SelectionPrompt,
    clock: &'a dyn Clock,
    store: &'a ConfigStore<S>,
}

impl<'a, S: Storage> SelectionNegotiator<'a, S> {
    pub fn new(
        prompt: &'a dyn SelectionPrompt,
        clock: &'a dyn Clock,
        store: &'a ConfigStore<S>,
    ) -> Self {
        Self {
            prompt,
            clock,
            store,
        }
    }

    pub async fn negotiate(&self, roster: &[ClassSummary]) -> Result<Selection> {
        let preselected = self.store.load_selection().await;
        let form = build_form(roster, &preselected, self.clock.now());

        tracing::info!("🗳️ Waiting for class selection ({} available)", roster.len());
        let submission = self.prompt.prompt(&form).await?;
        let selection = resolve_submission(submission);

        self.store.save_selection(&selection.selected_class_ids).await?;

        tracing::info!(
            "Selected {} class(es), scheduled: {}",
            selection.selected_class_ids.len(),
            selection
                .scheduled_instant
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| "no".to_string())
        );
        Ok(selection)
    }
}

pub fn build_form(roster: &[ClassSummary], preselected: &[String], now: DateTime<Local>) -> SelectionForm {
    let end_of_day = now.date_naive().and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default());

    SelectionForm {
        classes: roster
            .iter()
            .map(|class| FormEntry {
                id: class.id.clone(),
                label: class.formatted_label(),
                checked: preselected.contains(&class.id),
            })
            .collect(),
        min_time: now.format(INPUT_TIME_FORMAT).to_string(),
        default_time: end_of_day.format(INPUT_TIME_FORMAT).to_string(),
    }
}

/// 勾選「排程」才採用時間；時間無法解析時視為立即執行
pub fn resolve_submission(submission: FormSubmission) -> Selection {
    let mut selected_class_ids: Vec<String> = Vec::new();
    for id in submission.selected_class_ids {
        if !selected_class_ids.contains(&id) {
            selected_class_ids.push(id);
        }
    }

    let scheduled_instant = if submission.schedule {
        let raw = submission.schedule_time.unwrap_or_default();
        let parsed = parse_local_time(&raw);
        if parsed.is_none() {
            tracing::warn!("⚠️ Could not parse scheduled time '{}', starting immediately", raw);
        }
        parsed
    } else {
        None
    };

    Selection {
        selected_class_ids,
        scheduled_instant,
    }
}

pub fn parse_local_time(raw: &str) -> Option<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(raw, INPUT_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()?;
    naive.and_local_timezone(Local).earliest()
}

impl SelectionForm {
    /// Standalone page for the selection view. On submit it stores the form
    /// values as JSON-ready object in `window.__masterySelection`.
    pub fn render_html(&self) -> String {
        let mut rows = String::new();
        for entry in &self.classes {
            let id = escape_html(&entry.id);
            rows.push_str(&format!(
                r#"      <div>
        <input type="checkbox" data-class="true" id="{id}" name="{id}" value="{id}"{checked}>
        <label for="{id}">{label}</label>
      </div>
"#,
                id = id,
                checked = if entry.checked { " checked" } else { "" },
                label = escape_html(&entry.label),
            ));
        }

        format!(
            r#"<!DOCTYPE html>
<html>
  <head>
    <title>Select Classes</title>
  </head>
  <body>
    <h1>Select Classes</h1>
    <form>
{rows}      <hr />
      <div>
        <input type="checkbox" id="schedule" name="schedule" value="schedule">
        <label for="schedule">Schedule? (Uncheck to run immediately)</label>
      </div>
      <div>
        <label for="scheduleTime">Time if scheduled</label>
        <input type="datetime-local" id="scheduleTime" name="scheduleTime" min="{min}" value="{value}">
      </div>
      <input type="submit" value="Submit">
    </form>
    <script>
      document.querySelector("form").addEventListener("submit", function (e) {{
        e.preventDefault();
        var form = e.target;
        var classes = Array.from(form.querySelectorAll("input[type=checkbox][data-class=true]"));
        window.{global} = {{
          selectedClassIds: classes.filter(function (c) {{ return c.checked; }}).map(function (c) {{ return c.value; }}),
          schedule: form.querySelector("input[name=schedule]").checked,
          scheduleTime: form.querySelector("input[name=scheduleTime]").value || null
        }};
      }});
    </script>
  </body>
</html>
"#,
            rows = rows,
            min = escape_html(&self.min_time),
            value = escape_html(&self.default_time),
            global = SUBMISSION_GLOBAL,
        )
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
