//! Identity and role predicates. Each one is a pure yes/no question about a
//! principal and, optionally, the record being acted on.

use uuid::Uuid;

use super::principal::{Principal, ResourceContext};
use crate::models::committee::CommitteeRole;

pub fn is_admin(principal: &Principal) -> bool {
    principal.is_staff || principal.is_superuser
}

/// Dive Officer of the club the principal currently belongs to.
pub fn is_dive_officer(principal: &Principal) -> bool {
    principal.holds(principal.club_id, CommitteeRole::DiveOfficer)
}

pub fn is_regional_dive_officer(principal: &Principal) -> bool {
    !principal.regions_led.is_empty()
}

pub fn leads_region(principal: &Principal, region_id: Option<Uuid>) -> bool {
    region_id.is_some_and(|region| principal.regions_led.contains(&region))
}

/// True when a member of `member_club` has `principal` as their Dive Officer.
pub fn has_as_dive_officer(principal: &Principal, member_club: Option<Uuid>) -> bool {
    is_club_member_of(principal, member_club) && is_dive_officer(principal)
}

pub fn is_same_user(principal: &Principal, ctx: &ResourceContext) -> bool {
    ctx.user_id == Some(principal.user_id)
}

pub fn is_creator(principal: &Principal, ctx: &ResourceContext) -> bool {
    ctx.creator_id == Some(principal.user_id)
}

pub fn is_organizer(principal: &Principal, ctx: &ResourceContext) -> bool {
    ctx.organizer_id == Some(principal.user_id)
}

pub fn is_course_organizer(principal: &Principal, ctx: &ResourceContext) -> bool {
    ctx.course_organizer_id == Some(principal.user_id)
}

/// Holds at least one committee position, in any club.
pub fn has_any_role(principal: &Principal) -> bool {
    !principal.positions.is_empty()
}

pub fn is_club_member_of(principal: &Principal, club_id: Option<Uuid>) -> bool {
    club_id == Some(principal.club_id)
}

pub fn is_in_region(principal: &Principal, region_id: Option<Uuid>) -> bool {
    region_id == Some(principal.region_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member() -> Principal {
        Principal::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn staff_or_superuser_is_admin() {
        assert!(!is_admin(&member()));
        assert!(is_admin(&member().with_staff(true)));
        assert!(is_admin(&member().with_superuser(true)));
    }

    #[test]
    fn dive_officer_must_hold_role_in_current_club() {
        let p = member();
        let own_club = p.club_id;
        let do_here = p.clone().with_positions([(own_club, CommitteeRole::DiveOfficer)]);
        assert!(is_dive_officer(&do_here));

        let do_elsewhere = member().with_positions([(Uuid::new_v4(), CommitteeRole::DiveOfficer)]);
        assert!(!is_dive_officer(&do_elsewhere));

        let treasurer = p.with_positions([(own_club, CommitteeRole::Treasurer)]);
        assert!(!is_dive_officer(&treasurer));
        assert!(has_any_role(&treasurer));
    }

    #[test]
    fn committee_membership_is_any_position() {
        assert!(!has_any_role(&member()));
        let captain = member().with_positions([(Uuid::new_v4(), CommitteeRole::Captain)]);
        assert!(has_any_role(&captain));
    }

    #[test]
    fn regional_dive_officer_is_by_region_reference() {
        let region = Uuid::new_v4();
        let rdo = member().with_regions_led([region]);
        assert!(is_regional_dive_officer(&rdo));
        assert!(leads_region(&rdo, Some(region)));
        assert!(!leads_region(&rdo, Some(Uuid::new_v4())));
        assert!(!leads_region(&rdo, None));
        assert!(!is_regional_dive_officer(&member()));
    }

    #[test]
    fn has_as_dive_officer_needs_same_club() {
        let p = member();
        let club = p.club_id;
        let officer = p.with_positions([(club, CommitteeRole::DiveOfficer)]);
        assert!(has_as_dive_officer(&officer, Some(club)));
        assert!(!has_as_dive_officer(&officer, Some(Uuid::new_v4())));
        assert!(!has_as_dive_officer(&officer, None));

        let plain = member();
        assert!(!has_as_dive_officer(&plain, Some(plain.club_id)));
    }

    #[test]
    fn attribute_checks_fail_closed() {
        let p = member();
        let empty = ResourceContext::new();
        assert!(!is_same_user(&p, &empty));
        assert!(!is_creator(&p, &empty));
        assert!(!is_organizer(&p, &empty));
        assert!(!is_course_organizer(&p, &empty));

        let ctx = ResourceContext::new()
            .with_user(p.user_id)
            .with_creator(p.user_id)
            .with_organizer(p.user_id)
            .with_course_organizer(p.user_id);
        assert!(is_same_user(&p, &ctx));
        assert!(is_creator(&p, &ctx));
        assert!(is_organizer(&p, &ctx));
        assert!(is_course_organizer(&p, &ctx));
    }
}
