//! The ordered list of protocol steps a probe drives.

/// A single step kind in a probe [`Sequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Step {
    Greeting,
    Ehlo,
    Helo,
    StartTls,
    MailFrom,
    RcptTo,
    Vrfy,
    Quit,
}

/// An ordered list of steps plus the overrides that parameterize a couple
/// of them.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Sequence {
    pub steps: Vec<Step>,
    /// `MAIL FROM` reverse-path; defaults to `<>`.
    pub from: String,
    /// `VRFY` target local part; `None` means "use the probed local part".
    pub vrfy_target: Option<String>,
}

impl Default for Sequence {
    /// `[GREETING, EHLO, MAIL_FROM, RCPT_TO]`, from `<>`, `VRFY` target =
    /// the probed local part.
    fn default() -> Self {
        Self {
            steps: vec![Step::Greeting, Step::Ehlo, Step::MailFrom, Step::RcptTo],
            from: "<>".to_string(),
            vrfy_target: None,
        }
    }
}

impl Sequence {
    /// The empty sequence: a trivial transport-reachability probe, a
    /// success as soon as the TCP/TLS connection is up.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            steps: Vec::new(),
            from: "<>".to_string(),
            vrfy_target: None,
        }
    }

    /// Rewrite `EHLO` to `HELO`, as required on port 25.
    #[must_use]
    pub fn with_helo_instead_of_ehlo(mut self) -> Self {
        for step in &mut self.steps {
            if *step == Step::Ehlo {
                *step = Step::Helo;
            }
        }
        self
    }

    #[must_use]
    pub fn contains(&self, step: Step) -> bool {
        self.steps.contains(&step)
    }
}
