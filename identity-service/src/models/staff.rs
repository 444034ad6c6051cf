//! Staff member model - the person records behind every credential.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Organizational sector a staff member belongs to (exactly one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Setor {
    Administrativo,
    Financeiro,
    Pedagogico,
    Eventos,
    Marketing,
}

impl Setor {
    pub const ALL: [Setor; 5] = [
        Setor::Administrativo,
        Setor::Financeiro,
        Setor::Pedagogico,
        Setor::Eventos,
        Setor::Marketing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Setor::Administrativo => "ADMINISTRATIVO",
            Setor::Financeiro => "FINANCEIRO",
            Setor::Pedagogico => "PEDAGOGICO",
            Setor::Eventos => "EVENTOS",
            Setor::Marketing => "MARKETING",
        }
    }
}

impl std::str::FromStr for Setor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMINISTRATIVO" => Ok(Setor::Administrativo),
            "FINANCEIRO" => Ok(Setor::Financeiro),
            "PEDAGOGICO" => Ok(Setor::Pedagogico),
            "EVENTOS" => Ok(Setor::Eventos),
            "MARKETING" => Ok(Setor::Marketing),
            _ => Err(format!("Unknown sector: {}", s)),
        }
    }
}

/// Role capability a staff member holds (one or more).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Funcao {
    Administrador,
    Colaborador,
    LiderGeral,
    LiderEventos,
    LiderMasterclass,
    LiderConfronto,
}

impl Funcao {
    pub const ALL: [Funcao; 6] = [
        Funcao::Administrador,
        Funcao::Colaborador,
        Funcao::LiderGeral,
        Funcao::LiderEventos,
        Funcao::LiderMasterclass,
        Funcao::LiderConfronto,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Funcao::Administrador => "ADMINISTRADOR",
            Funcao::Colaborador => "COLABORADOR",
            Funcao::LiderGeral => "LIDER_GERAL",
            Funcao::LiderEventos => "LIDER_EVENTOS",
            Funcao::LiderMasterclass => "LIDER_MASTERCLASS",
            Funcao::LiderConfronto => "LIDER_CONFRONTO",
        }
    }

    /// Lead roles grant the same escalated access as each other, one step
    /// below administrator.
    pub fn is_lead(&self) -> bool {
        matches!(
            self,
            Funcao::LiderGeral
                | Funcao::LiderEventos
                | Funcao::LiderMasterclass
                | Funcao::LiderConfronto
        )
    }
}

impl std::str::FromStr for Funcao {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMINISTRADOR" => Ok(Funcao::Administrador),
            "COLABORADOR" => Ok(Funcao::Colaborador),
            "LIDER_GERAL" => Ok(Funcao::LiderGeral),
            "LIDER_EVENTOS" => Ok(Funcao::LiderEventos),
            "LIDER_MASTERCLASS" => Ok(Funcao::LiderMasterclass),
            "LIDER_CONFRONTO" => Ok(Funcao::LiderConfronto),
            _ => Err(format!("Unknown function: {}", s)),
        }
    }
}

/// Credential provider used at registration/login time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Credentials,
    Google,
}

/// Staff member entity. `deleted_at` is a soft-delete marker: a set value
/// excludes the row from every lookup and uniqueness check.
#[derive(Debug, Clone)]
pub struct StaffMember {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub email: String,
    pub secret_hash: String,
    pub phone: Option<String>,
    pub sector: Setor,
    pub functions: Vec<Funcao>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl StaffMember {
    pub fn is_admin(&self) -> bool {
        self.functions.contains(&Funcao::Administrador)
    }

    pub fn has_lead_function(&self) -> bool {
        self.functions.iter().any(Funcao::is_lead)
    }

    /// Projection without credential material, safe to return to clients.
    pub fn profile(&self) -> StaffProfile {
        StaffProfile {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            display_name: self.display_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            sector: self.sector,
            functions: self.functions.clone(),
            photo_url: self.photo_url.clone(),
            created_at: self.created_at,
        }
    }
}

/// Fields for inserting a new staff member; the store assigns id and
/// timestamps.
#[derive(Debug, Clone)]
pub struct NewStaffMember {
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub email: String,
    pub secret_hash: String,
    pub phone: Option<String>,
    pub sector: Setor,
    pub functions: Vec<Funcao>,
    pub photo_url: Option<String>,
}

/// Fully-resolved profile values to persist. The service layer merges the
/// caller's partial changes against the current row before building this.
#[derive(Debug, Clone)]
pub struct StaffUpdate {
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub sector: Setor,
    pub functions: Vec<Funcao>,
}

/// Client-facing staff projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffProfile {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub sector: Setor,
    pub functions: Vec<Funcao>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Emails are stored and compared trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Display name is always derived from the name parts, never stored
/// independently of them.
pub fn display_name_for(first_name: &str, last_name: &str) -> String {
    format!("{} {}", first_name.trim(), last_name.trim())
        .trim()
        .to_string()
}
