use serde::{Deserialize, Serialize};
use sqlx::pool::PoolConnection;
use sqlx::{query_scalar, Sqlite};

use crate::error::Error;

// field = None marks an error against the form as a whole
#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: Option<&'static str>,
    pub message: String,
}

#[derive(Debug, Default, Serialize)]
pub struct FieldErrors {
    pub errors: Vec<FieldError>,
}

impl FieldErrors {
    fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: Some(field),
            message: message.into(),
        });
    }

    fn add_form(&mut self, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: None,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

fn chars_between(value: &str, min: usize, max: usize) -> bool {
    let n = value.chars().count();
    n >= min && n <= max
}

fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.contains(char::is_whitespace)
}

#[derive(Debug, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegistrationForm {
    // existence checks only run for fields that already pass the cheap ones
    pub async fn validate(
        self,
        conn: &mut PoolConnection<Sqlite>,
    ) -> Result<Result<NewUser, FieldErrors>, Error> {
        let mut errors = FieldErrors::default();
        if !chars_between(&self.username, 5, 100) {
            errors.add("username", "username must be 5 to 100 characters");
        } else {
            let taken: bool = query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(&self.username)
                .fetch_one(&mut *conn)
                .await?;
            if taken {
                errors.add("username", "a user with that username already exists");
            }
        }
        if !is_valid_email(&self.email) {
            errors.add("email", "enter a valid email address");
        } else {
            let taken: bool = query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(&self.email)
                .fetch_one(&mut *conn)
                .await?;
            if taken {
                errors.add("email", "a user with that email already exists");
            }
        }
        if !chars_between(&self.password1, 5, 100) {
            errors.add("password1", "password must be 5 to 100 characters");
        }
        if !chars_between(&self.password2, 5, 100) {
            errors.add("password2", "password must be 5 to 100 characters");
        }
        if self.password1 != self.password2 {
            errors.add_form("passwords do not match");
        }
        if !errors.is_empty() {
            return Ok(Err(errors));
        }
        Ok(Ok(NewUser {
            username: self.username,
            email: self.email,
            password: self.password1,
        }))
    }
}

#[derive(Debug, Deserialize)]
pub struct PollForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub choice1: String,
    #[serde(default)]
    pub choice2: String,
    #[serde(default)]
    pub choice3: String,
    #[serde(default)]
    pub choice4: String,
}

#[derive(Debug)]
pub struct NewPoll {
    pub text: String,
    pub choices: [String; 4],
}

impl PollForm {
    pub fn validate(self) -> Result<NewPoll, FieldErrors> {
        let mut errors = FieldErrors::default();
        if !chars_between(&self.text, 1, 255) {
            errors.add("text", "text must be 1 to 255 characters");
        }
        for (field, value) in [
            ("choice1", &self.choice1),
            ("choice2", &self.choice2),
            ("choice3", &self.choice3),
            ("choice4", &self.choice4),
        ] {
            if !chars_between(value, 3, 100) {
                errors.add(field, "choice must be 3 to 100 characters");
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(NewPoll {
            text: self.text,
            choices: [self.choice1, self.choice2, self.choice3, self.choice4],
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct EditPollForm {
    #[serde(default)]
    pub text: String,
}

impl EditPollForm {
    pub fn validate(self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::default();
        if !chars_between(&self.text, 1, 255) {
            errors.add("text", "text must be 1 to 255 characters");
        }
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(self.text)
    }
}

#[derive(Debug, Deserialize)]
pub struct ChoiceForm {
    #[serde(default)]
    pub choice_text: String,
}

impl ChoiceForm {
    pub fn validate(self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::default();
        if !chars_between(&self.choice_text, 3, 100) {
            errors.add("choice_text", "choice must be 3 to 100 characters");
        }
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(self.choice_text)
    }
}
