/// A message update, classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Start(&'a str),
    Stats,
    Users,
    Broadcast,
    AddPoints(&'a str),
    /// Free text or `/skip`, both fed to the wizard.
    Reply(&'a str),
    Unknown,
}

impl<'a> Command<'a> {
    pub fn parse(text: &'a str) -> Self {
        let trimmed = text.trim();
        if !trimmed.starts_with('/') {
            return Self::Reply(text);
        }

        let (head, args) = match trimmed.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (trimmed, ""),
        };
        // "/start@my_bot" addresses the same command.
        let name = head.split('@').next().unwrap_or(head);

        match name {
            "/start" => Self::Start(args),
            "/admin" => Self::Stats,
            "/users" => Self::Users,
            "/broadcast" => Self::Broadcast,
            "/addpoints" => Self::AddPoints(args),
            "/skip" => Self::Reply("/skip"),
            _ => Self::Unknown,
        }
    }

    /// Known commands keep working while an admin has a broadcast armed;
    /// free text and unknown commands are what gets broadcast.
    pub fn is_command(&self) -> bool {
        match self {
            Self::Reply(text) => *text == "/skip",
            Self::Unknown => false,
            _ => true,
        }
    }
}

/// A button press, classified by its callback data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    CheckChannels,
    ReferLink,
    MyPoints,
    StartWizard,
    Vpn(bool),
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        Some(match data {
            "check_channels" => Self::CheckChannels,
            "refer_link" => Self::ReferLink,
            "my_points" => Self::MyPoints,
            "start_wizard" => Self::StartWizard,
            "vpn_yes" => Self::Vpn(true),
            "vpn_no" => Self::Vpn(false),
            _ => return None,
        })
    }
}
