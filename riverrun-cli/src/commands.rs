//! Command implementations. Each one maps a parsed subcommand onto the core
//! library and prints the result as text or JSON.

use crate::cli::{
    AttachCommands, RiverCommands, RiverFields, SettingsCommands, TripCommands, TripFields,
    TripToggle,
};
use crate::settings::{save_settings, AppSettings};
use anyhow::{bail, Context as _, Result};
use chrono::Local;
use riverrun_core::{
    default_export_file_name, import_payload, read_document, write_export, AttachmentManager,
    DataLocation, ImportOptions, ImportSummary, ReconcileReport, RecordOutcome, River, RiverData,
    RiverFilter, RiverStore, TripLog, TripLogData,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Everything a command needs, resolved once at startup.
pub struct Context {
    pub location: DataLocation,
    pub settings: AppSettings,
    pub settings_path: PathBuf,
    pub json: bool,
}

impl Context {
    fn store(&self) -> Result<RiverStore> {
        self.location.ensure_root()?;
        RiverStore::open(&self.location.database).with_context(|| {
            format!("Failed to open database {}", self.location.database.display())
        })
    }

    fn attachments(&self) -> Result<AttachmentManager> {
        Ok(AttachmentManager::new(self.store()?, &self.location.attachments))
    }

    fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

// ── Rivers ────────────────────────────────────────────────────

fn set<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn apply_river_fields(data: &mut RiverData, f: RiverFields) {
    set(&mut data.region, f.region);
    set(&mut data.latitude, f.latitude);
    set(&mut data.longitude, f.longitude);
    set(&mut data.difficulty_class, f.difficulty);
    set(&mut data.length_miles, f.length_miles);
    set(&mut data.typical_flow_min, f.flow_min);
    set(&mut data.typical_flow_max, f.flow_max);
    set(&mut data.put_in_location, f.put_in);
    set(&mut data.take_out_location, f.take_out);
    set(&mut data.shuttle_info, f.shuttle);
    set(&mut data.parking_details, f.parking);
    set(&mut data.best_seasons, f.seasons);
    set(&mut data.water_level_source, f.gauge);
    set(&mut data.hazards, f.hazards);
    set(&mut data.portages, f.portages);
    set(&mut data.emergency_contacts, f.emergency);
    set(&mut data.description, f.description);
    set(&mut data.personal_rating, f.rating);
    set(&mut data.notes, f.notes);
    set(&mut data.tags, f.tags);
}

fn river_line(river: &River) -> String {
    let difficulty = river
        .data
        .difficulty_class
        .map_or("-".to_string(), |d| d.to_string());
    let rating = river
        .data
        .personal_rating
        .map_or(String::new(), |r| format!("  {}", "*".repeat(r as usize)));
    format!(
        "{:>4}  {:<28} {:<24} {:<9}{rating}",
        river.id, river.data.name, river.data.location, difficulty
    )
}

pub fn river(ctx: &Context, command: RiverCommands) -> Result<()> {
    match command {
        RiverCommands::Add {
            name,
            location,
            fields,
        } => {
            let store = ctx.store()?;
            let mut data = RiverData::new(name, location);
            apply_river_fields(&mut data, fields);
            let id = store.add_river(&data)?;
            let river = store.get_river(id)?;
            if ctx.json {
                ctx.print_json(&river)
            } else {
                println!("Added river {id}: {}", river.data.name);
                Ok(())
            }
        }
        RiverCommands::List { search, difficulty } => {
            let rivers = ctx
                .store()?
                .list_rivers_filtered(&RiverFilter { search, difficulty })?;
            if ctx.json {
                return ctx.print_json(&rivers);
            }
            if rivers.is_empty() {
                println!("No rivers found.");
            }
            for river in &rivers {
                println!("{}", river_line(river));
            }
            Ok(())
        }
        RiverCommands::Show { id } => {
            let store = ctx.store()?;
            let river = store.get_river(id)?;
            let trips = store.get_trip_logs(Some(id))?;
            let documents = store.get_river_documents(id)?;
            if ctx.json {
                return ctx.print_json(&serde_json::json!({
                    "river": river,
                    "trips": trips,
                    "attachments": documents,
                }));
            }
            print_river(&river);
            println!("\nTrips ({}):", trips.len());
            for trip in &trips {
                println!("  {}", trip_line(trip));
            }
            println!("\nAttachments ({}):", documents.len());
            for doc in &documents {
                println!("  {:>4}  {}  {}", doc.id, doc.file_name, doc.description);
            }
            Ok(())
        }
        RiverCommands::Edit {
            id,
            name,
            location,
            fields,
        } => {
            let store = ctx.store()?;
            let mut data = store.get_river(id)?.data;
            if let Some(name) = name {
                data.name = name;
            }
            if let Some(location) = location {
                data.location = location;
            }
            apply_river_fields(&mut data, fields);
            let river = store.update_river(id, &data)?;
            if ctx.json {
                ctx.print_json(&river)
            } else {
                println!("Updated river {id}: {}", river.data.name);
                Ok(())
            }
        }
        RiverCommands::Delete { id } => {
            let Some(removal) = ctx.attachments()?.delete_river(id)? else {
                bail!("River {id} does not exist");
            };
            if ctx.json {
                return ctx.print_json(&removal);
            }
            println!(
                "Deleted river {id} with {} trip logs and {} attachments",
                removal.deletion.trip_logs_removed,
                removal.deletion.attachments.len()
            );
            for failure in &removal.file_failures {
                println!("  warning: could not delete {}: {}", failure.file_path, failure.error);
            }
            Ok(())
        }
    }
}

fn print_river(river: &River) {
    let d = &river.data;
    println!("{} (#{})", d.name, river.id);
    println!("  Location:    {}", d.location);
    let optional = [
        ("Region", d.region.clone()),
        ("Difficulty", d.difficulty_class.map(|c| c.to_string())),
        (
            "Coordinates",
            d.latitude
                .zip(d.longitude)
                .map(|(lat, lon)| format!("{lat:.5}, {lon:.5}")),
        ),
        ("Length", d.length_miles.map(|l| format!("{l} mi"))),
        (
            "Flow range",
            match (d.typical_flow_min, d.typical_flow_max) {
                (None, None) => None,
                (min, max) => Some(format!(
                    "{} - {} CFS",
                    min.map_or("?".to_string(), |v| v.to_string()),
                    max.map_or("?".to_string(), |v| v.to_string())
                )),
            },
        ),
        ("Put-in", d.put_in_location.clone()),
        ("Take-out", d.take_out_location.clone()),
        ("Shuttle", d.shuttle_info.clone()),
        ("Parking", d.parking_details.clone()),
        ("Seasons", d.best_seasons.clone()),
        ("Gauge", d.water_level_source.clone()),
        ("Hazards", d.hazards.clone()),
        ("Portages", d.portages.clone()),
        ("Emergency", d.emergency_contacts.clone()),
        ("Description", d.description.clone()),
        ("Rating", d.personal_rating.map(|r| format!("{r}/5"))),
        ("Notes", d.notes.clone()),
        ("Tags", d.tags.clone()),
    ];
    for (label, value) in optional {
        if let Some(value) = value {
            println!("  {:<12} {value}", format!("{label}:"));
        }
    }
    println!("  Added:       {}", river.date_added.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
    println!("  Updated:     {}", river.last_updated.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
}

// ── Trips ─────────────────────────────────────────────────────

fn trip_line(trip: &TripLog) -> String {
    let hours = trip
        .data
        .duration_hours
        .map_or(String::new(), |h| format!("  {h}h"));
    let rating = trip
        .data
        .trip_rating
        .map_or(String::new(), |r| format!("  {}", "*".repeat(r as usize)));
    format!(
        "{:>4}  {}  {}{hours}{rating}",
        trip.id, trip.data.trip_date, trip.river_name
    )
}

fn apply_trip_fields(data: &mut TripLogData, f: TripFields) {
    set(&mut data.companions, f.companions);
    set(&mut data.water_level, f.water_level);
    set(&mut data.weather_conditions, f.weather);
    set(&mut data.flow_rate, f.flow);
    set(&mut data.duration_hours, f.hours);
    set(&mut data.difficulty_experienced, f.difficulty);
    set(&mut data.highlights, f.highlights);
    set(&mut data.challenges, f.challenges);
    set(&mut data.gear_used, f.gear);
    set(&mut data.trip_rating, f.rating);
    set(&mut data.notes, f.notes);
}

pub fn trip(ctx: &Context, command: TripCommands) -> Result<()> {
    match command {
        TripCommands::Add {
            river_id,
            date,
            fields,
        } => {
            let store = ctx.store()?;
            let mut data = TripLogData::new(river_id, date);
            apply_trip_fields(&mut data, fields);
            let id = store.add_trip_log(&data)?;
            let trip = store.get_trip_log(id)?;
            if ctx.json {
                ctx.print_json(&trip)
            } else {
                println!("Logged trip {id} on {} ({})", trip.river_name, trip.data.trip_date);
                Ok(())
            }
        }
        TripCommands::List { river } => {
            let trips = ctx.store()?.get_trip_logs(river)?;
            if ctx.json {
                return ctx.print_json(&trips);
            }
            if trips.is_empty() {
                println!("No trips logged.");
            }
            for trip in &trips {
                println!("{}", trip_line(trip));
            }
            Ok(())
        }
        TripCommands::Edit {
            id,
            river,
            date,
            fields,
        } => {
            let store = ctx.store()?;
            let mut data = store.get_trip_log(id)?.data;
            if let Some(river) = river {
                data.river_id = river;
            }
            if let Some(date) = date {
                data.trip_date = date;
            }
            apply_trip_fields(&mut data, fields);
            let trip = store.update_trip_log(id, &data)?;
            if ctx.json {
                ctx.print_json(&trip)
            } else {
                println!("Updated trip {id} on {} ({})", trip.river_name, trip.data.trip_date);
                Ok(())
            }
        }
        TripCommands::Delete { id } => {
            if !ctx.store()?.delete_trip_log(id)? {
                bail!("Trip log {id} does not exist");
            }
            if !ctx.json {
                println!("Deleted trip log {id}");
            }
            Ok(())
        }
    }
}

// ── Attachments ───────────────────────────────────────────────

pub fn attach(ctx: &Context, command: AttachCommands) -> Result<()> {
    let manager = ctx.attachments()?;
    match command {
        AttachCommands::Add {
            river_id,
            file,
            description,
        } => {
            let attachment = manager.attach(river_id, &file, &description)?;
            if ctx.json {
                ctx.print_json(&attachment)
            } else {
                println!(
                    "Attached {} ({} bytes) as #{}",
                    attachment.file_name, attachment.file_size, attachment.id
                );
                Ok(())
            }
        }
        AttachCommands::List { river_id } => {
            let store = manager.store();
            store.get_river(river_id)?;
            let docs = store.get_river_documents(river_id)?;
            if ctx.json {
                return ctx.print_json(&docs);
            }
            if docs.is_empty() {
                println!("No attachments.");
            }
            for doc in &docs {
                println!(
                    "{:>4}  {:<32} {:<6} {:>10}  {}",
                    doc.id, doc.file_name, doc.file_type, doc.file_size, doc.description
                );
            }
            Ok(())
        }
        AttachCommands::Describe { id, description } => {
            let attachment = manager
                .store()
                .update_attachment_description(id, &description)?;
            if ctx.json {
                ctx.print_json(&attachment)
            } else {
                println!("Updated attachment {id}");
                Ok(())
            }
        }
        AttachCommands::Remove { id } => {
            let removal = manager.remove(id)?;
            if ctx.json {
                return ctx.print_json(&removal);
            }
            println!("Removed attachment {id} ({})", removal.attachment.file_name);
            if let Some(warning) = removal.warning {
                println!("  warning: {warning}");
            }
            Ok(())
        }
        AttachCommands::Open { id } => Ok(manager.open(id)?),
    }
}

// ── Export / import ───────────────────────────────────────────

pub fn export(ctx: &Context, path: Option<PathBuf>, trips: TripToggle) -> Result<()> {
    let include_trips = trips.resolve(ctx.settings.include_trip_logs);
    let path = path.unwrap_or_else(|| PathBuf::from(default_export_file_name(Local::now().date_naive())));
    let document = write_export(&ctx.store()?, &path, include_trips)
        .with_context(|| format!("Failed to export to {}", path.display()))?;

    let trip_count = document.trips.as_ref().map_or(0, Vec::len);
    if ctx.json {
        return ctx.print_json(&serde_json::json!({
            "path": path,
            "rivers": document.rivers.len(),
            "trips": trip_count,
        }));
    }
    if include_trips {
        println!(
            "Exported {} rivers and {trip_count} trips to {}",
            document.rivers.len(),
            path.display()
        );
    } else {
        println!("Exported {} rivers to {}", document.rivers.len(), path.display());
    }
    Ok(())
}

pub fn import(ctx: &Context, path: &Path, trips: TripToggle) -> Result<()> {
    let options = ImportOptions {
        include_trip_logs: trips.resolve(ctx.settings.include_trip_logs),
    };
    let payload =
        read_document(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let summary = import_payload(&ctx.store()?, &payload, options)?;

    if ctx.json {
        return ctx.print_json(&summary);
    }
    print_import_summary(&summary);
    Ok(())
}

fn print_import_summary(summary: &ImportSummary) {
    println!(
        "Rivers: {} imported, {} skipped",
        summary.rivers.imported_count(),
        summary.rivers.skipped_count()
    );
    print_skips(&summary.rivers);
    if summary.trips_ignored > 0 {
        println!("Trips: {} skipped (trip import disabled)", summary.trips_ignored);
    } else {
        println!(
            "Trips: {} imported, {} skipped",
            summary.trips.imported_count(),
            summary.trips.skipped_count()
        );
        print_skips(&summary.trips);
    }
}

fn print_skips(report: &ReconcileReport) {
    for record in &report.records {
        let reason = match &record.outcome {
            RecordOutcome::Imported { .. } | RecordOutcome::SkippedDuplicate => continue,
            RecordOutcome::SkippedUnresolvedRiver => "no river with that name".to_string(),
            RecordOutcome::SkippedInvalid { reason } => format!("invalid: {reason}"),
            RecordOutcome::SkippedFailed { reason } => format!("failed: {reason}"),
        };
        println!("  #{} {}: {reason}", record.index + 1, record.label);
    }
}

// ── Stats, settings, location ─────────────────────────────────

pub fn stats(ctx: &Context) -> Result<()> {
    let stats = ctx.store()?.statistics()?;
    if ctx.json {
        return ctx.print_json(&stats);
    }
    println!("Rivers:        {}", stats.total_rivers);
    println!("Trips:         {}", stats.total_trips);
    println!("Hours paddled: {:.1}", stats.total_trip_hours);
    if let Some(avg) = stats.average_rating {
        println!("Avg rating:    {avg:.1}/5");
    }
    if !stats.difficulty_breakdown.is_empty() {
        println!("\nBy difficulty:");
        for (label, count) in &stats.difficulty_breakdown {
            println!("  {label:<10} {count}");
        }
    }
    if !stats.recent_trips.is_empty() {
        println!("\nRecent trips:");
        for trip in &stats.recent_trips {
            println!("  {}", trip_line(trip));
        }
    }
    Ok(())
}

pub fn settings(ctx: &Context, command: SettingsCommands) -> Result<()> {
    match command {
        SettingsCommands::Show => {
            if ctx.json {
                return ctx.print_json(&ctx.settings);
            }
            println!("theme:             {}", ctx.settings.theme);
            println!("include-trip-logs: {}", ctx.settings.include_trip_logs);
            println!(
                "data-directory:    {}",
                ctx.settings.data_directory.as_deref().unwrap_or("(default)")
            );
            println!("file:              {}", ctx.settings_path.display());
            Ok(())
        }
        SettingsCommands::Set { key, value } => {
            let mut updated = ctx.settings.clone();
            updated.set(&key, &value)?;
            save_settings(&ctx.settings_path, &updated)?;
            if ctx.json {
                ctx.print_json(&updated)
            } else {
                println!("Saved {key}");
                Ok(())
            }
        }
    }
}

pub fn location(ctx: &Context) -> Result<()> {
    if ctx.json {
        return ctx.print_json(&ctx.location);
    }
    println!("Data directory: {}", ctx.location.root.display());
    println!("Database:       {}", ctx.location.database.display());
    println!("Attachments:    {}", ctx.location.attachments.display());
    Ok(())
}
