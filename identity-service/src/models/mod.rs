pub mod recovery_token;
pub mod staff;

pub use recovery_token::RecoveryToken;
pub use staff::{
    normalize_email, Funcao, NewStaffMember, Provider, Setor, StaffMember, StaffProfile,
    StaffUpdate,
};
