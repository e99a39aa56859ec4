//! Passenger-facing travel suggestions derived from a finished prediction.

use chrono::Datelike;

use super::classify::RiskLevel;
use super::domain::{FactorCategory, FlightQuery, PredictionResult};

/// Ordered suggestions: risk-level block, delay-length note, factor-driven notes, then a
/// seasonal weather note.
pub fn advise(result: &PredictionResult, query: &FlightQuery) -> Vec<String> {
    let mut suggestions: Vec<String> = risk_block(result.risk_level)
        .iter()
        .map(|line| line.to_string())
        .collect();

    if result.estimated_delay_minutes > 60 {
        suggestions.push("⏰ 预计延误超过1小时，请合理安排时间".to_string());
    } else if result.estimated_delay_minutes > 30 {
        suggestions.push("⏰ 预计延误30-60分钟，建议稍早出发".to_string());
    }

    let has = |category: FactorCategory| result.factors.iter().any(|f| f.category == category);
    if has(FactorCategory::TimeOfDay) {
        suggestions.push("🚗 高峰时段交通拥堵，请提前出发".to_string());
    }
    if has(FactorCategory::Season) {
        suggestions.push("👥 节假日期间客流大，请耐心等待".to_string());
    }
    if has(FactorCategory::OriginAirport) {
        suggestions.push("🏢 繁忙机场安检时间长，请提前到达".to_string());
    }

    match query.departure().month() {
        6..=8 => suggestions.push("☀️ 夏季多雷雨，建议关注天气".to_string()),
        12 | 1 | 2 => suggestions.push("❄️ 冬季可能受冰雪影响".to_string()),
        _ => {}
    }

    suggestions
}

fn risk_block(level: RiskLevel) -> &'static [&'static str] {
    match level {
        RiskLevel::High | RiskLevel::VeryHigh => &[
            "🔴 延误风险极高，强烈建议：",
            "• 联系航空公司改签至更早航班",
            "• 购买航班延误险",
            "• 准备备用交通方案（高铁/其他航班）",
            "• 提前4小时到达机场",
            "• 关注机场实时大屏和航空公司APP",
        ],
        RiskLevel::Medium => &[
            "🟡 延误风险中等，建议：",
            "• 提前3小时到达机场",
            "• 在线值机并打印登机牌",
            "• 预留充足转机时间（至少3小时）",
            "• 开启航班动态实时提醒",
        ],
        RiskLevel::Low => &[
            "🟢 延误风险较低，建议：",
            "• 提前2.5小时到达机场",
            "• 使用电子登机牌",
            "• 正常安排行程",
            "• 关注天气变化",
        ],
        RiskLevel::VeryLow => &["✅ 延误风险极低，建议：", "• 提前2小时到达机场即可"],
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::prediction::{FlightRequest, PredictionEngine, ProfileTables};

    fn request(carrier: &str, origin: &str, date: &str, time: &str) -> FlightRequest {
        FlightRequest {
            carrier: carrier.to_string(),
            flight_number: format!("{carrier}1001"),
            origin: origin.to_string(),
            destination: "CTU".to_string(),
            departure_date: date.to_string(),
            departure_time: time.to_string(),
        }
    }

    fn predict(request: &FlightRequest) -> (PredictionResult, FlightQuery) {
        let engine = PredictionEngine::new(Arc::new(ProfileTables::builtin()));
        let query = FlightQuery::parse(request).expect("valid query");
        (engine.predict_query(&query, None), query)
    }

    #[test]
    fn low_risk_summer_peak() {
        let (result, query) = predict(&request("CA", "PEK", "2024-07-15", "18:30"));
        let suggestions = advise(&result, &query);

        assert_eq!(suggestions[0], "🟢 延误风险较低，建议：");
        assert!(suggestions.contains(&"🚗 高峰时段交通拥堵，请提前出发".to_string()));
        assert!(suggestions.contains(&"👥 节假日期间客流大，请耐心等待".to_string()));
        assert_eq!(
            suggestions.last().map(String::as_str),
            Some("☀️ 夏季多雷雨，建议关注天气")
        );
        assert!(!suggestions.iter().any(|s| s.starts_with('⏰')));
    }

    #[test]
    fn quiet_spring_midday_has_only_the_risk_block() {
        let (result, query) = predict(&request("MF", "NKG", "2024-03-12", "13:00"));
        let suggestions = advise(&result, &query);
        assert_eq!(suggestions, risk_block(result.risk_level).to_vec());
    }

    #[test]
    fn long_delays_get_a_timing_note() {
        let (mut result, query) = predict(&request("MF", "NKG", "2024-12-03", "13:00"));
        result.risk_level = RiskLevel::High;
        result.estimated_delay_minutes = 82;

        let suggestions = advise(&result, &query);
        assert_eq!(suggestions[0], "🔴 延误风险极高，强烈建议：");
        assert!(suggestions.contains(&"⏰ 预计延误超过1小时，请合理安排时间".to_string()));
        assert_eq!(
            suggestions.last().map(String::as_str),
            Some("❄️ 冬季可能受冰雪影响")
        );
    }
}
