use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use course_enroll::api::{EnrollmentApi, HttpEnrollmentApi};
use course_enroll::config::EnrollConfig;
use course_enroll::error::Result;
use course_enroll::enrollment::{
    CoursePreferencesStep, CourseSelection, EnrollmentStep, EnrollmentSubmitter, NavState,
    Navigation, PaymentProof, PaymentUploadStep, PersonalInfoStep, PreferencesForm,
};
use course_enroll::profile::dob::{age_on, format_dob, normalize_dob};
use course_enroll::profile::ClaimsVerifier;
use course_enroll::session::{Session, SystemClock};
use course_enroll::store::{LibSqlStore, RecordStore};

/// Line-oriented stdin prompts. `None` means stdin closed.
struct Prompter {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompter {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn line(&mut self) -> Option<String> {
        match self.lines.next_line().await {
            Ok(line) => line.map(|l| l.trim().to_string()),
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                None
            }
        }
    }

    /// Ask for a value, keeping `current` when the answer is blank.
    async fn ask(&mut self, label: &str, current: &str) -> Option<String> {
        if current.is_empty() {
            eprint!("{label}: ");
        } else {
            eprint!("{label} [{current}]: ");
        }
        let answer = self.line().await?;
        Some(if answer.is_empty() {
            current.to_string()
        } else {
            answer
        })
    }

    async fn optional(&mut self, label: &str) -> Option<Option<String>> {
        let answer = self.ask(label, "").await?;
        Some(Some(answer).filter(|a| !a.is_empty()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = EnrollConfig::from_env()?;

    eprintln!("🎓 Course Enroll v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {}", config.api_base_url);

    // ── Session ─────────────────────────────────────────────────────────
    let store: Arc<dyn RecordStore> =
        Arc::new(LibSqlStore::new_local(Path::new(&config.db_path)).await?);
    eprintln!("   Records: {}", config.db_path);

    let session = Arc::new(Session::new(store, Arc::new(SystemClock)));

    if let (Some(secret), Ok(token)) = (&config.claims_secret, std::env::var("ENROLL_AUTH_TOKEN")) {
        match session
            .authenticate(&token, &ClaimsVerifier::with_hs256(secret))
            .await
        {
            Ok(claims) => eprintln!(
                "   Signed in as: {}",
                claims.email.or(claims.sub).unwrap_or_default()
            ),
            Err(e) => eprintln!("   Warning: Ignoring auth token: {}", e),
        }
    }

    if let Some(recent) = session.recent_enrollment().await {
        eprintln!("   {}", recent.banner());
    }

    // ── Backend ─────────────────────────────────────────────────────────
    let api: Arc<dyn EnrollmentApi> = Arc::new(HttpEnrollmentApi::new(&config)?);
    let submitter = Arc::new(
        EnrollmentSubmitter::new(api, config.verify_course)
            .with_verify_timeout(config.verify_timeout),
    );

    let mut prompt = Prompter::new();

    // Course from the command line (`course-enroll "<title>" <price>`), else storage.
    let args: Vec<String> = std::env::args().skip(1).collect();
    let inbound_course = match args.as_slice() {
        [title, price] => match Decimal::from_str(price) {
            Ok(price) => Some(CourseSelection::new(title, price)),
            Err(e) => {
                eprintln!("Error: Invalid price {:?}: {}", price, e);
                std::process::exit(2);
            }
        },
        _ => None,
    };
    let stored_course = session.selected_course().await;
    if let Some(course) = inbound_course.as_ref().or(stored_course.as_ref()) {
        eprintln!(
            "   Course: {}",
            course.title.as_deref().unwrap_or("(untitled)")
        );
    }
    eprintln!();

    let mut step = EnrollmentStep::PersonalInfo;
    let mut nav = NavState::new(inbound_course, None);

    while !step.is_terminal() {
        let next = match step {
            EnrollmentStep::PersonalInfo => {
                personal_info(&session, &submitter, &config, nav.clone(), &mut prompt).await
            }
            EnrollmentStep::CoursePreferences => {
                course_preferences(&session, &submitter, nav.clone(), &mut prompt).await
            }
            EnrollmentStep::Payment => {
                payment(&session, &submitter, &config, nav.clone(), &mut prompt).await
            }
            EnrollmentStep::Dashboard => break,
        };

        let Some(navigation) = next else {
            eprintln!("\nBye.");
            return Ok(());
        };
        if !step.can_transition_to(navigation.to) {
            tracing::warn!(from = %step, to = %navigation.to, "Unexpected navigation; staying put");
            continue;
        }
        tracing::debug!(from = %step, to = %navigation.to, "Navigating");
        step = navigation.to;
        nav = navigation.state;
    }

    eprintln!("✅ Enrollment complete. See you on the dashboard.");
    Ok(())
}

async fn personal_info(
    session: &Arc<Session>,
    submitter: &Arc<EnrollmentSubmitter>,
    config: &EnrollConfig,
    inbound: NavState,
    prompt: &mut Prompter,
) -> Option<Navigation> {
    let step = PersonalInfoStep::new(Arc::clone(session), Arc::clone(submitter), config, inbound);
    let prefill = step.initialize().await;
    if prefill.auto_filled {
        eprintln!("ℹ️  Some fields were filled in from your account. Please review them.");
    }

    eprintln!("── Personal information ──");
    let mut identity = prefill.identity.clone();
    loop {
        identity.name = prompt.ask("Full name", &identity.name).await?;
        identity.email = prompt.ask("Email", &identity.email).await?;
        identity.phone = prompt.ask("Phone", &identity.phone).await?;
        let dob_text = identity.dob.map(format_dob).unwrap_or_default();
        let dob_answer = prompt.ask("Date of birth (YYYY-MM-DD)", &dob_text).await?;
        identity.dob = normalize_dob(&dob_answer);
        let age_default = identity
            .age
            .or_else(|| identity.dob.map(|d| age_on(d, session.today())))
            .map(|a| a.to_string())
            .unwrap_or_default();
        identity.age = prompt.ask("Age", &age_default).await?.parse().ok();
        identity.gender = prompt.ask("Gender", &identity.gender).await?;

        match step.submit(identity.clone()).await {
            Ok(nav) => return Some(nav),
            Err(e) => eprintln!("❌ {}\n", e.user_message()),
        }
    }
}

async fn course_preferences(
    session: &Arc<Session>,
    submitter: &Arc<EnrollmentSubmitter>,
    inbound: NavState,
    prompt: &mut Prompter,
) -> Option<Navigation> {
    let step = CoursePreferencesStep::new(Arc::clone(session), Arc::clone(submitter), inbound.clone());

    eprintln!("── Course preferences ──");
    let mut form = PreferencesForm::default();
    loop {
        form.current_skills = prompt.ask("Current skills", &form.current_skills).await?;
        form.field_of_study = prompt.ask("Field of study", &form.field_of_study).await?;
        form.language = prompt.ask("Preferred language", &form.language).await?;
        form.goals = prompt.optional("Goals (optional)").await?;
        form.background = prompt.optional("Background (optional)").await?;
        form.time_commitment = prompt.optional("Weekly time commitment (optional)").await?;

        match step.submit(form.clone()).await {
            Ok(nav) => return Some(nav),
            Err(e) => {
                eprintln!("❌ {}\n", e.user_message());
                if let Some(to) = e.redirect() {
                    return Some(Navigation::new(to, inbound));
                }
            }
        }
    }
}

async fn payment(
    session: &Arc<Session>,
    submitter: &Arc<EnrollmentSubmitter>,
    config: &EnrollConfig,
    inbound: NavState,
    prompt: &mut Prompter,
) -> Option<Navigation> {
    let step = PaymentUploadStep::new(Arc::clone(session), Arc::clone(submitter), config, inbound.clone());

    eprintln!("── Payment ──");
    if let Some(course) = &inbound.course {
        let price = course.price.map(|p| p.to_string()).unwrap_or_else(|| "?".into());
        eprintln!(
            "Course: {} (₹{})",
            course.title.as_deref().unwrap_or("(untitled)"),
            price
        );
    }

    loop {
        if step.preview().is_none() {
            let path = prompt.ask("Path to payment screenshot", "").await?;
            if path.is_empty() {
                continue;
            }
            let proof = match PaymentProof::from_path(Path::new(&path)).await {
                Ok(proof) => proof,
                Err(e) => {
                    eprintln!("❌ Could not read {}: {}", path, e);
                    continue;
                }
            };
            if let Err(e) = step.select_file(proof) {
                eprintln!("❌ {}", e.user_message());
                continue;
            }
            eprintln!("Uploading…");
            if let Some(preview) = step.wait_until_uploaded().await {
                eprintln!("Screenshot ready ({} bytes of preview).", preview.data_url.len());
            }
        }

        let choice = prompt.ask("Submit payment? [y]es / [r]emove file", "y").await?;
        if choice.eq_ignore_ascii_case("r") {
            if let Err(e) = step.remove_file() {
                eprintln!("❌ {}", e.user_message());
            }
            continue;
        }

        match step.submit().await {
            Ok(result) => {
                eprintln!("🎉 Payment submitted. Payment {}.", result.payment_id);
                eprintln!("   {}", result.banner());
                eprintln!(
                    "   Redirecting in {}s, press Enter to go now.",
                    config.redirect_delay.as_secs()
                );
                let mut redirect = step.watch_navigation();
                tokio::select! {
                    _ = redirect.changed() => {}
                    _ = prompt.line() => {}
                }
                return step.go_now();
            }
            Err(e) => {
                eprintln!("❌ {}\n", e.user_message());
                if let Some(to) = e.redirect() {
                    return Some(Navigation::new(to, inbound));
                }
            }
        }
    }
}
