//! `inbox`, `sent` and `show`.

use std::io::Write;

use anyhow::{Context as _, bail};
use chrono::{Local, NaiveDate};
use clap::Args;
use opsdesk_core::{DateRange, Email, EmailFilters, Folder, LoadOptions, LoadSupervisor};

use super::Context;

/// Listing options shared by `inbox` and `sent`.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Case-insensitive text matched against subject, sender, recipients and preview
    #[arg(short, long)]
    pub search: Option<String>,

    /// Only emails with attachments
    #[arg(long, conflicts_with = "no_attachments")]
    pub attachments: bool,

    /// Only emails without attachments
    #[arg(long)]
    pub no_attachments: bool,

    /// Date window: today, yesterday or last-<days> (e.g. last-7)
    #[arg(long, value_parser = parse_range, conflicts_with_all = ["since", "until"])]
    pub range: Option<DateRange>,

    /// First day included (YYYY-MM-DD)
    #[arg(long)]
    pub since: Option<NaiveDate>,

    /// Last day included (YYYY-MM-DD)
    #[arg(long)]
    pub until: Option<NaiveDate>,

    /// Items per page
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Load at least this many items (progressive paging)
    #[arg(long)]
    pub count: Option<usize>,

    /// Skip the list cache and always ask the backend
    #[arg(long)]
    pub no_cache: bool,

    /// Include bodies and attachment payloads
    #[arg(long)]
    pub full: bool,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl ListArgs {
    fn filters(&self) -> EmailFilters {
        let mut filters = EmailFilters {
            search: self.search.clone(),
            limit: self.limit,
            ..EmailFilters::default()
        };
        if self.attachments {
            filters = filters.with_attachments(true);
        } else if self.no_attachments {
            filters = filters.with_attachments(false);
        }
        if let Some(range) = self.range {
            filters = filters.with_date_range(range);
        } else if self.since.is_some() || self.until.is_some() {
            filters = filters.with_date_range(DateRange::Custom {
                from: self.since,
                to: self.until,
            });
        }
        filters
    }

    fn options(&self) -> LoadOptions {
        let mut options = LoadOptions::default();
        if self.no_cache {
            options = options.bypass_cache();
        }
        if self.full {
            options = options.full();
        }
        if let Some(count) = self.count {
            options = options.required(count);
        }
        options
    }
}

fn parse_range(s: &str) -> Result<DateRange, String> {
    match s.to_ascii_lowercase().as_str() {
        "today" => Ok(DateRange::Today),
        "yesterday" => Ok(DateRange::Yesterday),
        other => other
            .strip_prefix("last-")
            .and_then(|days| days.parse().ok())
            .map(|days| DateRange::LastDays { days })
            .ok_or_else(|| format!("expected today, yesterday or last-<days>, got {s:?}")),
    }
}

/// Lists a folder.
pub async fn list(ctx: &Context, folder: Folder, args: &ListArgs) -> anyhow::Result<()> {
    let loader = ctx.loader()?;
    let supervisor = LoadSupervisor::new();
    let cancel = supervisor.begin();

    let filters = args.filters();
    let load = loader.load(folder, &filters, args.options(), &cancel);
    let emails = tokio::select! {
        result = load => result?,
        _ = tokio::signal::ctrl_c() => {
            supervisor.cancel();
            bail!("interrupted");
        }
    };

    let mut out = std::io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &emails)?;
        writeln!(out)?;
    } else {
        print_table(&mut out, &emails)?;
    }
    Ok(())
}

fn print_table(out: &mut impl Write, emails: &[Email]) -> std::io::Result<()> {
    if emails.is_empty() {
        return writeln!(out, "No emails.");
    }
    for email in emails {
        let date = email.date.with_timezone(&Local).format("%Y-%m-%d %H:%M");
        let clip = if email.has_attachments { '+' } else { ' ' };
        writeln!(
            out,
            "{date}  {clip} {:<28}  {}  [{}]",
            truncate(&email.from, 28),
            email.subject,
            email.id
        )?;
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut clipped: String = s.chars().take(max.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

/// Shows one email with its body, from cache when possible.
pub async fn show(ctx: &Context, folder: Folder, id: &str, json: bool) -> anyhow::Result<()> {
    let loader = ctx.loader()?;
    let email = if let Some(email) = loader.cached_full(id) {
        email
    } else {
        let page = loader
            .load(
                folder,
                &EmailFilters::default(),
                LoadOptions::default().full(),
                &LoadSupervisor::new().begin(),
            )
            .await?;
        page.into_iter()
            .find(|e| e.id == id)
            .map(|e| loader.enrich(e))
            .with_context(|| format!("no {folder} email with id {id} in the latest page"))?
    };

    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &email)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "From:    {}", email.from)?;
    writeln!(out, "To:      {}", email.to)?;
    if let Some(cc) = &email.cc {
        writeln!(out, "Cc:      {cc}")?;
    }
    writeln!(out, "Date:    {}", email.date.with_timezone(&Local).to_rfc2822())?;
    writeln!(out, "Subject: {}", email.subject)?;
    for attachment in &email.attachments {
        writeln!(
            out,
            "Attach:  {} ({}, {} bytes)",
            attachment.filename, attachment.mime_type, attachment.size
        )?;
    }
    writeln!(out)?;
    let body = email
        .text_body
        .as_deref()
        .or(email.html_body.as_deref())
        .unwrap_or(&email.preview);
    writeln!(out, "{body}")?;
    Ok(())
}
