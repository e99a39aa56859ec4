use crate::infra::{build_prediction_service, parse_date, parse_time};
use chrono::{NaiveDate, NaiveTime};
use clap::Args;
use flight_delay::config::AppConfig;
use flight_delay::error::AppError;
use flight_delay::telemetry;
use flight_delay::prediction::{EngineStatistics, FlightRequest, PredictionEngine, PredictionReport};

#[derive(Args, Debug)]
pub(crate) struct PredictArgs {
    /// Two-letter carrier code, e.g. CA
    #[arg(long)]
    pub(crate) carrier: String,
    /// Flight number, e.g. CA1501
    #[arg(long)]
    pub(crate) flight: String,
    /// Origin airport code
    #[arg(long)]
    pub(crate) origin: String,
    /// Destination airport code
    #[arg(long)]
    pub(crate) destination: String,
    /// Departure date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) date: NaiveDate,
    /// Departure time (HH:MM)
    #[arg(long, value_parser = parse_time)]
    pub(crate) time: NaiveTime,
    /// Print the full report as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run_predict(args: PredictArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let service = build_prediction_service(&config)?;

    let request = FlightRequest {
        carrier: args.carrier,
        flight_number: args.flight,
        origin: args.origin,
        destination: args.destination,
        departure_date: args.date.format("%Y-%m-%d").to_string(),
        departure_time: args.time.format("%H:%M:%S").to_string(),
    };
    let report = service.predict(&request).await?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&report).map_err(std::io::Error::from)?;
        println!("{rendered}");
    } else {
        print!("{}", render_report(&request, &report));
    }
    Ok(())
}

pub(crate) fn run_stats() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let engine = PredictionEngine::from_config(&config.prediction)?;
    print!("{}", render_stats(&engine.statistics()));
    Ok(())
}

fn render_report(request: &FlightRequest, report: &PredictionReport) -> String {
    let prediction = &report.prediction;
    let mut out = String::new();

    out.push_str(&format!(
        "{} {} -> {} ({} {})\n",
        request.flight_number.to_ascii_uppercase(),
        prediction.route_info.origin.name,
        prediction.route_info.destination.name,
        request.departure_date,
        request.departure_time,
    ));
    out.push_str(&format!(
        "- Carrier: {} ({}), historical delay rate {:.0}%\n",
        prediction.carrier_info.name,
        prediction.carrier_info.code,
        prediction.carrier_info.historical_delay_rate * 100.0
    ));
    out.push_str(&format!(
        "- Delay probability {:.1}% | risk {} | ~{} min (window {}-{} min) | confidence {:.0}%\n",
        prediction.delay_probability * 100.0,
        prediction.risk_label,
        prediction.estimated_delay_minutes,
        prediction.delay_window.min_minutes,
        prediction.delay_window.max_minutes,
        prediction.confidence * 100.0
    ));
    out.push_str(&format!("- Scored by: {}\n", prediction.model_used.label()));

    out.push_str("Factors:\n");
    for factor in &prediction.factors {
        out.push_str(&format!("  - {} ({:.3})\n", factor.description, factor.magnitude));
    }

    if let Some(context) = &report.context {
        out.push_str("Live context:\n");
        if let Some(status) = &context.flight_status {
            out.push_str(&format!(
                "  - Status {} ({}), delayed {} min\n",
                status.status, status.code, status.delay_minutes
            ));
        }
        out.push_str(&format!(
            "  - Weather impact origin {:.2} / destination {:.2}\n",
            context.origin_weather_impact, context.destination_weather_impact
        ));
        out.push_str(&format!(
            "  - Carrier on-time {:.0}% | recent average delay {:.1} min\n",
            context.carrier_on_time_rate * 100.0,
            context.historical_average_delay
        ));
        if !context.is_complete() {
            out.push_str(&format!(
                "  - Defaults used for {} unavailable signal(s)\n",
                context.unavailable_signals.len()
            ));
        }
    }

    out.push_str("Suggestions:\n");
    for suggestion in &report.suggestions {
        out.push_str(&format!("  {suggestion}\n"));
    }
    out
}

fn render_stats(stats: &EngineStatistics) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Scoring method: {}{}\n",
        stats.method,
        stats
            .model_version
            .as_deref()
            .map(|version| format!(" ({version})"))
            .unwrap_or_default()
    ));
    out.push_str(&format!("Profile tables: {}\n", stats.profile_version));
    out.push_str(&format!(
        "- {} carriers | {} airports\n",
        stats.carrier_count, stats.airport_count
    ));
    if let Some(rate) = stats.average_carrier_delay_rate {
        out.push_str(&format!("- Average carrier delay rate {:.1}%\n", rate * 100.0));
    }
    out
}
