use serde::Serialize;

/// Login input. Lives only for the duration of one `login` call.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of `POST /signup`.
#[derive(Clone, Serialize)]
pub struct RegistrationForm {
    pub email: String,
    pub name: String,
    pub surname: String,
    pub password: String,
}

impl RegistrationForm {
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        surname: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            surname: surname.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("surname", &self.surname)
            .field("password", &"<redacted>")
            .finish()
    }
}
