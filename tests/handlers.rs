mod common;

use chrono::NaiveDate;
use common::{
    now, ready_session, Fakes, RecordingAlarms, RecordingContacts, RecordingDialer,
    RecordingLauncher, ScriptedEngine,
};
use errand::capability::CallPermission;
use errand::handlers::{AppCatalog, ContactCallHandler, TaskHandler};
use errand::{CapabilityError, CompletionParams, ContextParams, Extractor, FixedClock, ModelSession};
use std::sync::Arc;

async fn route(fakes: &Fakes, reply: &str, text: &str) -> (String, ScriptedEngine) {
    let engine = ScriptedEngine::new(&[reply]);
    let session = ready_session(&engine).await;
    let status = fakes.router().route(text, &session, None).await;
    (status, engine)
}

#[tokio::test]
async fn wake_me_up_sets_a_monday_alarm() {
    let fakes = Fakes::default();
    let (status, engine) = route(
        &fakes,
        r#"{"Day":"Monday","Time":"7am"}"#,
        "wake me up at 7am on monday",
    )
    .await;
    assert_eq!(status, "⏰ Alarm set at 07:00 on Monday (Day: 2)");
    assert_eq!(*fakes.alarms.set.lock().unwrap(), vec![(7, 0, vec![2])]);
    assert_eq!(engine.params.lock().unwrap()[0], CompletionParams::GENERAL);
}

#[tokio::test]
async fn unparseable_alarm_reply_sets_fallback_for_now() {
    let fakes = Fakes::default();
    let (status, _) = route(&fakes, "I can't do that", "set alarm please").await;
    assert!(status.starts_with("⚠️ Failed to parse response. Set fallback alarm at 09:30 on Wednesday"));
    assert!(status.contains("Raw LLM Output: \"I can't do that\""));
    assert_eq!(*fakes.alarms.set.lock().unwrap(), vec![(9, 30, vec![4])]);
}

#[tokio::test]
async fn missing_clock_app_is_explained() {
    let fakes = Fakes {
        alarms: Arc::new(RecordingAlarms::failing(vec![CapabilityError::NoCompatibleApp(
            "No app found to handle alarms".into(),
        )])),
        ..Default::default()
    };
    let (status, _) = route(&fakes, r#"{"Day":"Friday","Time":"06:15"}"#, "alarm at 6:15 friday").await;
    assert!(status.starts_with("⚠️ No app found to handle alarms. Please open Google Clock settings"));
    assert_eq!(fakes.alarms.attempts.lock().unwrap().len(), 1);
    assert!(fakes.alarms.set.lock().unwrap().is_empty());
}

#[tokio::test]
async fn scheduler_failure_falls_back_to_an_alarm_now() {
    let fakes = Fakes {
        alarms: Arc::new(RecordingAlarms::failing(vec![CapabilityError::Failed(
            "scheduler crashed".into(),
        )])),
        ..Default::default()
    };
    let (status, _) = route(&fakes, r#"{"Day":"Friday","Time":"06:15"}"#, "alarm at 6:15 friday").await;
    assert_eq!(status, "⚠️ scheduler crashed\nSet fallback alarm at 09:30 on Wednesday");
    assert_eq!(
        *fakes.alarms.attempts.lock().unwrap(),
        vec![(6, 15, vec![6]), (9, 30, vec![4])]
    );
    assert_eq!(*fakes.alarms.set.lock().unwrap(), vec![(9, 30, vec![4])]);
}

#[tokio::test]
async fn failing_fallback_alarm_reports_both_errors() {
    let fakes = Fakes {
        alarms: Arc::new(RecordingAlarms::failing(vec![
            CapabilityError::Failed("scheduler crashed".into()),
            CapabilityError::PermissionDenied("alarm permission revoked".into()),
        ])),
        ..Default::default()
    };
    let (status, _) = route(&fakes, r#"{"Day":"Friday","Time":"06:15"}"#, "alarm at 6:15 friday").await;
    assert_eq!(
        status,
        "⚠️ scheduler crashed\nFallback alarm failed: alarm permission revoked"
    );
    assert_eq!(fakes.alarms.attempts.lock().unwrap().len(), 2);
    assert!(fakes.alarms.set.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unparseable_reply_with_failing_scheduler_reports_the_error() {
    let fakes = Fakes {
        alarms: Arc::new(RecordingAlarms::failing(vec![CapabilityError::Failed(
            "scheduler crashed".into(),
        )])),
        ..Default::default()
    };
    let (status, _) = route(&fakes, "no idea", "set alarm please").await;
    assert_eq!(status, "⚠️ scheduler crashed");
    assert_eq!(*fakes.alarms.attempts.lock().unwrap(), vec![(9, 30, vec![4])]);
}

#[tokio::test]
async fn schedule_meeting_tomorrow_afternoon() {
    let fakes = Fakes::default();
    let (status, _) = route(
        &fakes,
        r#"{"Event":"Meeting","Date":"tomorrow","Time":"3pm"}"#,
        "schedule meeting tomorrow at 3pm",
    )
    .await;
    let shown = fakes.calendar.shown.lock().unwrap();
    assert_eq!(shown.len(), 1);
    let day = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
    assert_eq!(shown[0].title, "Meeting");
    assert_eq!(shown[0].start, day.and_hms_opt(15, 0, 0).unwrap());
    assert_eq!(shown[0].end, day.and_hms_opt(16, 0, 0).unwrap());
    assert_eq!(
        status,
        "📅 Calendar event dialog shown for: Meeting\n🕒 2026-10-15 15:00 to 2026-10-15 16:00"
    );
}

#[tokio::test]
async fn calendar_reply_without_json_still_opens_dialog() {
    let fakes = Fakes::default();
    let (status, _) = route(&fakes, "Sure, noted!", "add to calendar lunch with Ana").await;
    let shown = fakes.calendar.shown.lock().unwrap();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].title, "Untitled Event");
    assert_eq!(shown[0].start, now());
    assert!(status.contains("📅 Untitled Event at 09:30 on 2026-10-14"));
    assert!(status.contains("Raw LLM Output: \"Sure, noted!\""));
}

#[tokio::test]
async fn calendar_trailing_comma_is_repaired() {
    let fakes = Fakes::default();
    let (status, _) = route(
        &fakes,
        "Here you go: {\"Event\":\"Dentist\",\"Date\":\"2026-11-02\",\"Time\":\"10:00\",}",
        "create event dentist",
    )
    .await;
    assert!(status.starts_with("📅 Calendar event dialog shown for: Dentist"));
    let shown = fakes.calendar.shown.lock().unwrap();
    assert_eq!(
        shown[0].start,
        NaiveDate::from_ymd_opt(2026, 11, 2).unwrap().and_hms_opt(10, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn call_number_never_touches_contacts() {
    let fakes = Fakes::default();
    let (status, engine) = route(&fakes, r#"{"Number":"9876543210"}"#, "call 9876543210").await;
    assert_eq!(status, "📞 Calling +919876543210...");
    assert_eq!(*fakes.dialer.dialed.lock().unwrap(), vec!["+919876543210"]);
    assert_eq!(*fakes.contacts.lookups.lock().unwrap(), 0);
    assert_eq!(engine.params.lock().unwrap()[0], CompletionParams::TERSE);
}

#[tokio::test]
async fn call_without_a_number_reports_failure() {
    let fakes = Fakes::default();
    let (status, _) = route(&fakes, "Calling now", "call 9876543210").await;
    assert!(status.starts_with("⚠️ Failed to make call."), "{status}");
    assert!(fakes.dialer.dialed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn call_john_matches_the_exact_name_only() {
    let fakes = Fakes::default();
    let (status, _) = route(&fakes, r#"{"Name":"John"}"#, "call John").await;
    assert_eq!(status, "📞 Calling john (+15550100)...");
    assert_eq!(*fakes.dialer.dialed.lock().unwrap(), vec!["+15550100"]);
}

#[tokio::test]
async fn unknown_contact_is_reported() {
    let fakes = Fakes::default();
    let (status, _) = route(&fakes, r#"{"Name":"Jo"}"#, "call Jo").await;
    assert_eq!(status, "❌ No contact found with name \"Jo\"");
    assert!(fakes.dialer.dialed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn denied_permission_blocks_calls() {
    let fakes = Fakes {
        dialer: Arc::new(RecordingDialer {
            permission: CallPermission::Denied,
            ..Default::default()
        }),
        ..Default::default()
    };
    let (status, _) = route(&fakes, r#"{"Number":"9876543210"}"#, "call 9876543210").await;
    assert_eq!(status, "⚠️ Permission denied to make direct call.");

    let (status, _) = route(&fakes, r#"{"Name":"John"}"#, "call John").await;
    assert_eq!(status, "⚠️ Permissions denied for contacts or calling.");
    assert!(fakes.dialer.dialed.lock().unwrap().is_empty());
    assert_eq!(*fakes.contacts.lookups.lock().unwrap(), 0);
}

#[tokio::test]
async fn contact_call_dials_numbers_in_the_request_directly() {
    let dialer = Arc::new(RecordingDialer::default());
    let contacts = Arc::new(RecordingContacts::default());
    let handler = ContactCallHandler::new(
        dialer.clone(),
        contacts.clone(),
        Extractor::default(),
        Arc::new(FixedClock(now())),
    );
    let engine = ScriptedEngine::new(&[r#"{"Name":"nobody"}"#]);
    let session = ready_session(&engine).await;
    let status = handler
        .handle(&"ring +14155550123 now".into(), &session)
        .await
        .unwrap();
    assert_eq!(status, "📞 Calling +14155550123...");
    assert_eq!(engine.calls(), 0);
    assert_eq!(*contacts.lookups.lock().unwrap(), 0);
}

#[tokio::test]
async fn open_app_tries_fallback_identifiers_in_order() {
    let fakes = Fakes {
        launcher: Arc::new(RecordingLauncher::with(&["com.sec.android.app.camera"])),
        ..Default::default()
    };
    let (status, _) = route(&fakes, r#"{"App":"Camera"}"#, "open camera").await;
    assert_eq!(status, "📱 Opening camera...");
    assert_eq!(
        *fakes.launcher.probed.lock().unwrap(),
        vec![
            "com.android.camera",
            "com.google.android.GoogleCamera",
            "com.sec.android.app.camera",
        ]
    );
    assert_eq!(*fakes.launcher.launched.lock().unwrap(), vec!["com.sec.android.app.camera"]);
}

#[tokio::test]
async fn open_app_reports_missing_and_unknown_apps() {
    let fakes = Fakes::default();
    let (status, _) = route(&fakes, r#"{"App":"chrome"}"#, "open chrome").await;
    assert_eq!(status, "⚠️ App \"chrome\" is not installed on this device.");

    let (status, _) = route(&fakes, r#"{"App":"Spotify"}"#, "open spotify").await;
    assert_eq!(
        status,
        "❔ I couldn't find a known app for \"spotify\". Please try a different app."
    );
    assert!(fakes.launcher.launched.lock().unwrap().is_empty());
}

#[tokio::test]
async fn open_app_uses_catalog_aliases() {
    let launcher = Arc::new(RecordingLauncher::with(&["org.example.notes"]));
    let fakes = Fakes {
        launcher: launcher.clone(),
        ..Default::default()
    };
    let router = errand::Router::standard(
        &fakes.capabilities(),
        Extractor::default(),
        AppCatalog::default().with_alias("notes", vec!["org.example.notes".into()]),
        Arc::new(FixedClock(now())),
    );
    let engine = ScriptedEngine::new(&[r#"{"App":"notes"}"#]);
    let session = ready_session(&engine).await;
    assert_eq!(router.route("open notes", &session, None).await, "📱 Opening notes...");
    assert_eq!(*launcher.launched.lock().unwrap(), vec!["org.example.notes"]);
}

#[tokio::test]
async fn questions_get_the_model_text() {
    let fakes = Fakes::default();
    let (status, _) = route(&fakes, "  Paris is the capital of France.\n", "what is the capital of France?").await;
    assert_eq!(status, "Paris is the capital of France.");
}

#[tokio::test]
async fn blank_answers_are_reported_as_errors() {
    let fakes = Fakes::default();
    let (status, _) = route(&fakes, " \n ", "why is the sky blue?").await;
    assert_eq!(status, "⚠️ Error processing question. Please try again.");
}

#[tokio::test]
async fn unready_session_degrades_per_category() {
    let fakes = Fakes::default();
    let engine = ScriptedEngine::new(&["unused"]);
    let session = ModelSession::new(Arc::new(engine.clone()), ContextParams::default());
    let router = fakes.router();

    let status = router.route("what time is it in Tokyo?", &session, None).await;
    assert_eq!(status, "⚠️ Error processing question. Please try again.");

    let status = router.route("set alarm", &session, None).await;
    assert!(status.contains("Set fallback alarm at 09:30 on Wednesday"), "{status}");

    let status = router.route("call John", &session, None).await;
    assert!(status.starts_with("⚠️ Failed to call contact."), "{status}");
    assert_eq!(engine.calls(), 0);
}
