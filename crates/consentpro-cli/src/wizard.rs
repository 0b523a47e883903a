// crates/consentpro-cli/src/wizard.rs
// ============================================================================
// Module: Interactive Wizard
// Description: Line-oriented driver for the public consent flow.
// Purpose: Walk a person through lookup, consents, verification, and finalize.
// Dependencies: consentpro-core, thiserror, tokio
// ============================================================================

//! ## Overview
//! The wizard reads one answer per prompt and lets the flow decide what comes
//! next: each loop iteration inspects the current step and performs the single
//! action that step allows. Rejected input is reported through flow notices
//! and the same prompt is asked again, so every retry consumes a line. Steps
//! that need no input return their error instead of retrying. End of input
//! abandons the form.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::io::Write;
use std::time::Duration;

use consentpro_core::ConsentId;
use consentpro_core::FlowError;
use consentpro_core::FlowStep;
use consentpro_core::PublicFormFlow;
use consentpro_core::SmsStep;
use thiserror::Error;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;

use crate::render::consent_lines;
use crate::render::summary_lines;
use crate::t;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Wait before retrying an operation that found the flow busy.
const BUSY_RETRY: Duration = Duration::from_millis(100);

/// Answer that asks for another SMS dispatch at the code prompt.
const RESEND_ANSWER: &str = "r";

// ============================================================================
// SECTION: Types
// ============================================================================

/// How a wizard session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardOutcome {
    /// Consents were authorized.
    Finalized,
    /// Input ended before authorization.
    Abandoned,
    /// Biometric verification failed or timed out.
    Incomplete,
}

/// Wizard failures.
#[derive(Debug, Error)]
pub enum WizardError {
    /// Reading answers or writing prompts failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The flow refused a step that needs no input.
    #[error(transparent)]
    Flow(#[from] FlowError),
}

/// Line-oriented prompt channel.
struct Prompter<'a, R, W> {
    /// Answer source.
    input: &'a mut R,
    /// Prompt sink.
    output: &'a mut W,
}

impl<R, W> Prompter<'_, R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    /// Writes `prompt` and reads one trimmed answer; `None` at end of input.
    async fn ask(&mut self, prompt: &str) -> Result<Option<String>, WizardError> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Writes one line.
    fn say(&mut self, line: &str) -> Result<(), WizardError> {
        writeln!(self.output, "{line}")?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Driver
// ============================================================================

/// Drives an opened flow until it finalizes or input ends.
///
/// # Errors
///
/// Returns [`WizardError`] when the terminal fails or a step that needs no
/// input is refused by the flow.
pub async fn run_wizard<R, W>(
    flow: &PublicFormFlow,
    input: &mut R,
    output: &mut W,
) -> Result<WizardOutcome, WizardError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut prompter = Prompter {
        input,
        output,
    };
    loop {
        let snapshot = flow.snapshot();
        if !snapshot.is_ready() {
            return Err(FlowError::FormUnavailable.into());
        }
        let step = snapshot.session.step;
        let proceed = match step {
            FlowStep::Initial => ask_national_id(flow, &mut prompter).await?,
            FlowStep::ClientLookupDone => ask_personal_data(flow, &mut prompter).await?,
            FlowStep::PersonalDataComplete => ask_consents(flow, &mut prompter).await?,
            FlowStep::ConsentsSelected => {
                retry_busy(move || flow.request_code()).await?;
                true
            }
            FlowStep::CodeRequested => ask_code(flow, &mut prompter).await?,
            FlowStep::BiometricRedirected => {
                if !await_biometric(flow, &mut prompter).await? {
                    prompter.say(&t!("wizard.incomplete"))?;
                    return Ok(WizardOutcome::Incomplete);
                }
                true
            }
            FlowStep::CodeVerified => {
                retry_busy(move || flow.finalize()).await?;
                true
            }
            FlowStep::Finalized => {
                for line in summary_lines(flow) {
                    prompter.say(&line)?;
                }
                return Ok(WizardOutcome::Finalized);
            }
        };
        if !proceed {
            prompter.say(&t!("wizard.abandoned"))?;
            return Ok(WizardOutcome::Abandoned);
        }
    }
}

/// Runs `op`, waiting out [`FlowError::Busy`] while a background task holds the flow.
async fn retry_busy<F, Fut>(mut op: F) -> Result<(), FlowError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), FlowError>>,
{
    loop {
        match op().await {
            Err(FlowError::Busy) => tokio::time::sleep(BUSY_RETRY).await,
            other => return other,
        }
    }
}

/// Reports a rejected answer or propagates a flow failure that input cannot fix.
fn absorb<R, W>(
    prompter: &mut Prompter<'_, R, W>,
    result: Result<(), FlowError>,
) -> Result<(), WizardError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    match result {
        Ok(()) => Ok(()),
        Err(err @ (FlowError::Closed | FlowError::MissingToken | FlowError::FormUnavailable)) => {
            Err(err.into())
        }
        Err(err) => prompter.say(&t!("wizard.step_failed", error = err)),
    }
}

// ============================================================================
// SECTION: Steps
// ============================================================================

/// Reads a national ID and searches it.
async fn ask_national_id<R, W>(
    flow: &PublicFormFlow,
    prompter: &mut Prompter<'_, R, W>,
) -> Result<bool, WizardError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let Some(answer) = prompter.ask(&t!("wizard.prompt.national_id")).await? else {
        return Ok(false);
    };
    let result = match flow.set_national_id(&answer) {
        Ok(()) => flow.search_national_id().await,
        Err(err) => Err(err),
    };
    absorb(prompter, result)?;
    Ok(true)
}

/// Reads personal data fields; an empty answer keeps the current value.
async fn ask_personal_data<R, W>(
    flow: &PublicFormFlow,
    prompter: &mut Prompter<'_, R, W>,
) -> Result<bool, WizardError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let personal = flow.snapshot().inputs.personal;
    let fields: [(String, String, fn(&PublicFormFlow, &str) -> Result<(), FlowError>); 4] = [
        (t!("field.given_name"), personal.given_name, PublicFormFlow::set_given_name),
        (t!("field.family_name"), personal.family_name, PublicFormFlow::set_family_name),
        (t!("field.email"), personal.email, PublicFormFlow::set_email),
        (t!("field.phone"), personal.phone, PublicFormFlow::set_phone),
    ];
    for (label, current, set) in fields {
        let prompt = t!("wizard.prompt.field", label = label, current = current);
        let Some(answer) = prompter.ask(&prompt).await? else {
            return Ok(false);
        };
        if !answer.is_empty() {
            absorb(prompter, set(flow, &answer))?;
        }
    }
    absorb(prompter, flow.confirm_personal_data())?;
    Ok(true)
}

/// Shows the consent items and applies the selection typed by the person.
async fn ask_consents<R, W>(
    flow: &PublicFormFlow,
    prompter: &mut Prompter<'_, R, W>,
) -> Result<bool, WizardError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let snapshot = flow.snapshot();
    let Some(form) = snapshot.form else {
        return Err(FlowError::FormUnavailable.into());
    };
    for line in consent_lines(&form.consent_items(), flow.endpoints()) {
        prompter.say(&line)?;
    }
    let Some(answer) = prompter.ask(&t!("wizard.prompt.consents")).await? else {
        return Ok(false);
    };
    let Some(wanted) = parse_selection(prompter, &answer)? else {
        return Ok(true);
    };
    let selected = snapshot.inputs.selected_consents;
    for id in wanted.symmetric_difference(&selected) {
        absorb(prompter, flow.toggle_consent(*id))?;
    }
    absorb(prompter, flow.confirm_consents())?;
    Ok(true)
}

/// Parses comma-separated consent numbers; `None` after reporting a bad entry.
fn parse_selection<R, W>(
    prompter: &mut Prompter<'_, R, W>,
    answer: &str,
) -> Result<Option<BTreeSet<ConsentId>>, WizardError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut wanted = BTreeSet::new();
    for part in answer.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        match part.parse::<u32>() {
            Ok(id) => {
                wanted.insert(ConsentId::new(id));
            }
            Err(_) => {
                prompter.say(&t!("wizard.consent_invalid", value = part))?;
                return Ok(None);
            }
        }
    }
    Ok(Some(wanted))
}

/// Dispatches a manual SMS or reads and verifies a code.
async fn ask_code<R, W>(
    flow: &PublicFormFlow,
    prompter: &mut Prompter<'_, R, W>,
) -> Result<bool, WizardError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let sms_step = flow.snapshot().session.sms_step();
    if sms_step == Some(SmsStep::AwaitingDispatch) {
        if prompter.ask(&t!("wizard.prompt.send_sms")).await?.is_none() {
            return Ok(false);
        }
        return dispatch_sms(flow, prompter).await.map(|()| true);
    }
    let Some(answer) = prompter.ask(&t!("wizard.prompt.code")).await? else {
        return Ok(false);
    };
    if sms_step.is_some() && answer.eq_ignore_ascii_case(RESEND_ANSWER) {
        return dispatch_sms(flow, prompter).await.map(|()| true);
    }
    let result = match flow.set_code(&answer) {
        Ok(()) => flow.verify_code().await,
        Err(err) => Err(err),
    };
    absorb(prompter, result)?;
    Ok(true)
}

/// Requests an SMS dispatch; exhausting the attempts ends the wizard.
async fn dispatch_sms<R, W>(
    flow: &PublicFormFlow,
    prompter: &mut Prompter<'_, R, W>,
) -> Result<(), WizardError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    match flow.resend_sms_code().await {
        Err(FlowError::SmsAttemptsExhausted) => Err(FlowError::SmsAttemptsExhausted.into()),
        result => absorb(prompter, result),
    }
}

/// Waits for the biometric poll to settle; false when it ended unverified.
async fn await_biometric<R, W>(
    flow: &PublicFormFlow,
    prompter: &mut Prompter<'_, R, W>,
) -> Result<bool, WizardError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    prompter.say(&t!("wizard.waiting"))?;
    prompter.output.flush()?;
    let mut updates = flow.subscribe();
    let settled = updates
        .wait_for(|snapshot| {
            snapshot.session.step != FlowStep::BiometricRedirected || !snapshot.polling
        })
        .await
        .map(|snapshot| snapshot.session.step != FlowStep::BiometricRedirected);
    settled.map_err(|_| FlowError::Closed.into())
}
