use mongodb::bson::oid::ObjectId;
use stock_alarm::{
    error::AlarmError,
    models::AlertStatus,
    services::{
        alerts_service::{build_alert, is_valid_stock_code, normalize_thresholds, NewAlert},
        user_service::settings_url,
    },
};

fn new_alert<'a>(code: &'a str, name: &'a str, base_price: f64) -> NewAlert<'a> {
    NewAlert {
        stock_code: code,
        stock_name: name,
        base_price,
        threshold_upper: Some(10.0),
        threshold_lower: Some(5.0),
    }
}

#[test]
fn stock_codes_are_six_digits() {
    assert!(is_valid_stock_code("005930"));
    assert!(is_valid_stock_code(" 035720 "));
    assert!(!is_valid_stock_code("05930"));
    assert!(!is_valid_stock_code("0059300"));
    assert!(!is_valid_stock_code("AAPL00"));
}

#[test]
fn lower_threshold_is_stored_negative() {
    assert_eq!(normalize_thresholds(Some(10.0), Some(5.0)).unwrap(), (Some(10.0), Some(-5.0)));
    assert_eq!(normalize_thresholds(None, Some(-7.5)).unwrap(), (None, Some(-7.5)));
    assert_eq!(normalize_thresholds(Some(3.0), None).unwrap(), (Some(3.0), None));
}

#[test]
fn thresholds_must_be_usable() {
    assert!(matches!(
        normalize_thresholds(None, None),
        Err(AlarmError::Validation { field: "threshold", .. })
    ));
    assert!(matches!(
        normalize_thresholds(Some(0.0), None),
        Err(AlarmError::Validation { field: "threshold_upper", .. })
    ));
    assert!(matches!(
        normalize_thresholds(Some(-5.0), None),
        Err(AlarmError::Validation { field: "threshold_upper", .. })
    ));
    assert!(matches!(
        normalize_thresholds(None, Some(0.0)),
        Err(AlarmError::Validation { field: "threshold_lower", .. })
    ));
}

#[test]
fn new_alert_starts_active() {
    let user_id = ObjectId::new();
    let alert = build_alert(user_id, &new_alert(" 005930", " 삼성전자 ", 70_000.0), 1_700_000_000).unwrap();

    assert_eq!(alert.user_id, user_id);
    assert_eq!(alert.stock_code, "005930");
    assert_eq!(alert.stock_name, "삼성전자");
    assert_eq!(alert.base_price, 70_000.0);
    assert_eq!(alert.threshold_upper, Some(10.0));
    assert_eq!(alert.threshold_lower, Some(-5.0));
    assert_eq!(alert.status, AlertStatus::Active);
    assert_eq!(alert.triggered_at, None);
    assert_eq!(alert.created_at, 1_700_000_000);
}

#[test]
fn new_alert_rejects_bad_input() {
    let user_id = ObjectId::new();

    assert!(matches!(
        build_alert(user_id, &new_alert("5930", "삼성전자", 70_000.0), 0),
        Err(AlarmError::Validation { field: "stock_code", .. })
    ));
    assert!(matches!(
        build_alert(user_id, &new_alert("005930", "  ", 70_000.0), 0),
        Err(AlarmError::Validation { field: "stock_name", .. })
    ));
    assert!(matches!(
        build_alert(user_id, &new_alert("005930", "삼성전자", 0.0), 0),
        Err(AlarmError::InvalidBaseline(_))
    ));
    assert!(matches!(
        build_alert(user_id, &new_alert("005930", "삼성전자", f64::NAN), 0),
        Err(AlarmError::InvalidBaseline(_))
    ));
}

#[test]
fn settings_url_joins_token() {
    assert_eq!(
        settings_url("https://stockalarm.co.kr", "abc"),
        "https://stockalarm.co.kr/settings/abc"
    );
    assert_eq!(
        settings_url("https://stockalarm.co.kr/", "abc"),
        "https://stockalarm.co.kr/settings/abc"
    );
}
