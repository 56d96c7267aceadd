//! Declarative permission table.
//!
//! Every (resource, action) pair resolves to exactly one [`Rule`]: an explicit
//! entry, else the resource's default row, else deny.

use std::collections::HashMap;

use super::predicates;
use super::principal::{Principal, ResourceContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Club,
    Region,
    User,
    CommitteePosition,
    Course,
    CourseEnrolment,
    CourseInstruction,
    Qualification,
    Certificate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
    /// Sub-resources and extra routes
    Me,
    MembershipStatus,
    CoursesOrganized,
    CoursesTaught,
    Qualifications,
    DiveOfficers,
    Users,
    ActiveInstructors,
    Courses,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Allow,
    Deny,
    /// Any principal; authentication itself is checked by the extractor
    Authenticated,
    Admin,
    DiveOfficer,
    /// Dive Officer of the club in the context
    DiveOfficerOfTarget,
    SameUser,
    Creator,
    CourseOrganizer,
    CommitteeMember,
    MemberOfTargetClub,
    /// The context region is the region of the principal's club
    HomeRegion,
    LeadsTargetRegion,
    Any(Vec<Rule>),
    All(Vec<Rule>),
}

impl Rule {
    pub fn evaluate(&self, principal: &Principal, ctx: &ResourceContext) -> bool {
        match self {
            Rule::Allow | Rule::Authenticated => true,
            Rule::Deny => false,
            Rule::Admin => predicates::is_admin(principal),
            Rule::DiveOfficer => predicates::is_dive_officer(principal),
            Rule::DiveOfficerOfTarget => predicates::has_as_dive_officer(principal, ctx.club_id),
            Rule::SameUser => predicates::is_same_user(principal, ctx),
            Rule::Creator => predicates::is_creator(principal, ctx),
            Rule::CourseOrganizer => predicates::is_course_organizer(principal, ctx),
            Rule::CommitteeMember => predicates::has_any_role(principal),
            Rule::MemberOfTargetClub => predicates::is_club_member_of(principal, ctx.club_id),
            Rule::HomeRegion => predicates::is_in_region(principal, ctx.region_id),
            Rule::LeadsTargetRegion => predicates::leads_region(principal, ctx.region_id),
            Rule::Any(rules) => rules.iter().any(|rule| rule.evaluate(principal, ctx)),
            Rule::All(rules) => !rules.is_empty() && rules.iter().all(|rule| rule.evaluate(principal, ctx)),
        }
    }
}

static DENY: Rule = Rule::Deny;

#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    entries: HashMap<(Resource, Action), Rule>,
    defaults: HashMap<Resource, Rule>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(mut self, resource: Resource, actions: &[Action], rule: Rule) -> Self {
        for action in actions {
            self.entries.insert((resource, *action), rule.clone());
        }
        self
    }

    pub fn default_for(mut self, resource: Resource, rule: Rule) -> Self {
        self.defaults.insert(resource, rule);
        self
    }

    pub fn rule(&self, resource: Resource, action: Action) -> &Rule {
        self.entries
            .get(&(resource, action))
            .or_else(|| self.defaults.get(&resource))
            .unwrap_or(&DENY)
    }

    /// The federation's standing rules.
    pub fn standard() -> Self {
        use Action::*;
        use Resource::*;

        let admin_or_do = Rule::Any(vec![Rule::Admin, Rule::DiveOfficer]);
        let admin_do_or_self = Rule::Any(vec![Rule::Admin, Rule::DiveOfficer, Rule::SameUser]);
        let admin_own_do_or_self = Rule::Any(vec![Rule::Admin, Rule::DiveOfficerOfTarget, Rule::SameUser]);

        PolicyTable::new()
            // Clubs
            .allow(Club, &[List, DiveOfficers, Users], admin_or_do.clone())
            .allow(Club, &[Retrieve], Rule::Authenticated)
            .allow(
                Club,
                &[Update, PartialUpdate],
                Rule::Any(vec![Rule::Admin, Rule::All(vec![Rule::DiveOfficer, Rule::MemberOfTargetClub])]),
            )
            .allow(
                Club,
                &[Qualifications],
                Rule::Any(vec![Rule::Admin, Rule::All(vec![Rule::CommitteeMember, Rule::MemberOfTargetClub])]),
            )
            .default_for(Club, Rule::Admin)
            // Regions
            .allow(Region, &[List, Retrieve, Courses], Rule::Authenticated)
            .allow(
                Region,
                &[ActiveInstructors],
                Rule::Any(vec![
                    Rule::Admin,
                    Rule::All(vec![Rule::CommitteeMember, Rule::HomeRegion]),
                    Rule::LeadsTargetRegion,
                ]),
            )
            .default_for(Region, Rule::Admin)
            // Users
            .allow(User, &[List, Create], admin_or_do.clone())
            .allow(
                User,
                &[Retrieve, Update, PartialUpdate, MembershipStatus, CoursesOrganized, CoursesTaught],
                admin_do_or_self,
            )
            .allow(User, &[Me], Rule::Authenticated)
            .allow(User, &[Qualifications], admin_own_do_or_self.clone())
            .default_for(User, Rule::Admin)
            // Committee positions
            .allow(
                CommitteePosition,
                &[List],
                Rule::Any(vec![Rule::Admin, Rule::SameUser, Rule::DiveOfficerOfTarget]),
            )
            .default_for(CommitteePosition, Rule::Admin)
            // Courses
            .allow(Course, &[List, Retrieve], Rule::Authenticated)
            .allow(Course, &[Create, Update], admin_or_do)
            .allow(Course, &[PartialUpdate], Rule::Any(vec![Rule::Admin, Rule::Creator]))
            .default_for(Course, Rule::Admin)
            // Enrolments
            .allow(CourseEnrolment, &[Create, Destroy], admin_own_do_or_self)
            .default_for(CourseEnrolment, Rule::Authenticated)
            // Instructions
            .default_for(
                CourseInstruction,
                Rule::Any(vec![Rule::Admin, Rule::DiveOfficer, Rule::CourseOrganizer, Rule::SameUser]),
            )
            // Qualifications and certificates
            .allow(Qualification, &[List, Retrieve], Rule::Authenticated)
            .default_for(Qualification, Rule::Admin)
            .allow(Certificate, &[List, Retrieve], Rule::Authenticated)
            .default_for(Certificate, Rule::Admin)
    }
}
