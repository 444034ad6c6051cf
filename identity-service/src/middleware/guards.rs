//! Authorization guards.
//!
//! Every guard runs after `auth_middleware` and re-fetches the caller's
//! current sector and functions from the store; stale claim data is never
//! trusted. A subject that no longer resolves to an active staff member is
//! treated as unauthenticated, not merely forbidden.

use axum::{
    extract::{Request, State},
    http::Extensions,
    middleware::Next,
    response::Response,
};

use crate::models::{Funcao, Setor, StaffMember};
use crate::services::{ServiceError, SessionClaims};
use crate::AppState;
use service_core::error::AppError;

/// Per-route allow-lists, passed explicitly at route-registration time.
/// An empty list leaves that dimension unrestricted.
#[derive(Debug, Clone, Default)]
pub struct RouteAccess {
    pub allowed_functions: Vec<Funcao>,
    pub allowed_sectors: Vec<Setor>,
}

impl RouteAccess {
    pub fn functions(functions: impl Into<Vec<Funcao>>) -> Self {
        Self {
            allowed_functions: functions.into(),
            allowed_sectors: Vec::new(),
        }
    }

    pub fn sectors(sectors: impl Into<Vec<Setor>>) -> Self {
        Self {
            allowed_functions: Vec::new(),
            allowed_sectors: sectors.into(),
        }
    }
}

/// Decide whether a caller passes a route's allow-lists.
///
/// Administrators always pass. When both lists are constrained the caller
/// must satisfy both dimensions; when only one is constrained, satisfying
/// either dimension suffices. This tie-break is deliberate and must not be
/// "simplified".
pub fn evaluate_route_access(
    functions: &[Funcao],
    sector: Setor,
    access: &RouteAccess,
) -> bool {
    if functions.contains(&Funcao::Administrador) {
        return true;
    }

    let functions_constrained = !access.allowed_functions.is_empty();
    let sectors_constrained = !access.allowed_sectors.is_empty();

    let has_function =
        !functions_constrained || access.allowed_functions.iter().any(|f| functions.contains(f));
    let has_sector = !sectors_constrained || access.allowed_sectors.contains(&sector);

    if functions_constrained && sectors_constrained {
        has_function && has_sector
    } else if functions_constrained || sectors_constrained {
        has_function || has_sector
    } else {
        true
    }
}

/// Allow only administrators.
pub async fn admin_guard(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let staff = current_staff(&state, req.extensions()).await?;
    if !staff.is_admin() {
        return Err(ServiceError::Forbidden.into());
    }
    Ok(next.run(req).await)
}

/// Allow administrators and any of the lead functions.
pub async fn admin_or_lead_guard(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let staff = current_staff(&state, req.extensions()).await?;
    if !staff.is_admin() && !staff.has_lead_function() {
        return Err(ServiceError::Forbidden.into());
    }
    Ok(next.run(req).await)
}

/// Allow callers matching the route's `RouteAccess` lists.
pub async fn route_access_guard(
    State((state, access)): State<(AppState, RouteAccess)>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let staff = current_staff(&state, req.extensions()).await?;
    if !evaluate_route_access(&staff.functions, staff.sector, &access) {
        return Err(ServiceError::Forbidden.into());
    }
    Ok(next.run(req).await)
}

/// Resolve the request's subject to the current staff row.
async fn current_staff(
    state: &AppState,
    extensions: &Extensions,
) -> Result<StaffMember, AppError> {
    let staff_id = extensions
        .get::<SessionClaims>()
        .and_then(SessionClaims::staff_id)
        .ok_or_else(|| AppError::from(ServiceError::Unauthenticated))?;

    state
        .store
        .find_active_by_id(staff_id)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::from(ServiceError::Unauthenticated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn access(functions: &[Funcao], sectors: &[Setor]) -> RouteAccess {
        RouteAccess {
            allowed_functions: functions.to_vec(),
            allowed_sectors: sectors.to_vec(),
        }
    }

    #[test]
    fn test_admin_short_circuits_everything() {
        let caller = [Funcao::Administrador];
        let locked_down = access(&[Funcao::LiderGeral], &[Setor::Pedagogico]);
        assert!(evaluate_route_access(&caller, Setor::Marketing, &locked_down));
    }

    #[test]
    fn test_function_only_restriction_denies_wrong_function() {
        // functions=[COLABORADOR], sector=FINANCEIRO vs allowedFunctions=[ADMINISTRADOR]
        let caller = [Funcao::Colaborador];
        let route = access(&[Funcao::Administrador], &[]);
        assert!(!evaluate_route_access(&caller, Setor::Financeiro, &route));
    }

    #[test]
    fn test_sector_only_restriction_allows_matching_sector() {
        let caller = [Funcao::Colaborador];
        let route = access(&[], &[Setor::Financeiro]);
        assert!(evaluate_route_access(&caller, Setor::Financeiro, &route));
    }

    #[test]
    fn test_both_restricted_requires_both_dimensions() {
        // Sector matches, function does not: AND semantics deny.
        let caller = [Funcao::Colaborador];
        let route = access(&[Funcao::Administrador], &[Setor::Financeiro]);
        assert!(!evaluate_route_access(&caller, Setor::Financeiro, &route));
    }

    #[test]
    fn test_unrestricted_route_allows_anyone() {
        let caller = [Funcao::Colaborador];
        assert!(evaluate_route_access(
            &caller,
            Setor::Financeiro,
            &RouteAccess::default()
        ));
    }

    #[test]
    fn test_single_dimension_or_semantics() {
        // Only functions constrained; a caller matching the function list
        // passes regardless of sector.
        let caller = [Funcao::LiderEventos];
        let route = access(&[Funcao::LiderEventos], &[]);
        assert!(evaluate_route_access(&caller, Setor::Marketing, &route));

        // Only sectors constrained; wrong sector is denied.
        let route = access(&[], &[Setor::Eventos]);
        assert!(!evaluate_route_access(&caller, Setor::Marketing, &route));
    }

    #[test]
    fn test_both_restricted_and_both_matching_allows() {
        let caller = [Funcao::LiderMasterclass];
        let route = access(&[Funcao::LiderMasterclass], &[Setor::Pedagogico]);
        assert!(evaluate_route_access(&caller, Setor::Pedagogico, &route));
    }
}
