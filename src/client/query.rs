//! GraphQL documents for every read the connector performs.
//!
//! Coupa filters are passed as a single `Query` string argument using the
//! REST filter syntax (`id[gt]=10&active=true`), which is where the
//! pagination cursor is spliced in.

use crate::pagination::Cursor;

/// Cursor filter clause; empty for the first page.
pub fn pagination(cursor: &Cursor) -> String {
    if cursor.is_first_page() {
        return String::new();
    }
    format!("id[gt]={cursor}")
}

/// Cursor filter clause for appending after another filter.
pub fn appended_pagination(cursor: &Cursor) -> String {
    let clause = pagination(cursor);
    if clause.is_empty() {
        return clause;
    }
    format!("&{clause}")
}

/// Human users only (API/service users have a non-blank `type`).
pub fn all_users_query(cursor: &Cursor) -> String {
    let filter = join_filters(&pagination(cursor), "type[blank]=true");
    format!(
        r#"query getUsers {{
	users(Query: "{filter}") {{
		id
		email
		fullname
		active
	}}
}}"#
    )
}

pub fn groups_query(cursor: &Cursor) -> String {
    let filter = pagination(cursor);
    format!(
        r#"query getGroups {{
	userGroups(Query: "{filter}") {{
		id
		name
		description
	}}
}}"#
    )
}

pub fn roles_query(cursor: &Cursor) -> String {
    let filter = pagination(cursor);
    format!(
        r#"query getRoles {{
	roles(Query: "{filter}") {{
		id
		name
		description
	}}
}}"#
    )
}

/// Membership lives under the group, so this is a single unpaginated read.
pub fn group_members_query(group_id: i64) -> String {
    format!(
        r#"query getGroupMembers {{
	userGroups(Query: "id={group_id}") {{
		id
		users {{
			id
		}}
	}}
}}"#
    )
}

pub fn role_grants_query(role_id: i64, cursor: &Cursor) -> String {
    let page = appended_pagination(cursor);
    format!(
        r#"query getRoleGrants {{
	users(Query: "roles[id]={role_id}{page}") {{
		id
	}}
}}"#
    )
}

pub fn license_grants_query(license_flag: &str, cursor: &Cursor) -> String {
    let page = appended_pagination(cursor);
    format!(
        r#"query getLicenseGrants {{
	users(Query: "{license_flag}=true{page}") {{
		id
	}}
}}"#
    )
}

pub fn user_roles_query(user_id: i64) -> String {
    format!(
        r#"query getUserRoles {{
	users(Query: "id={user_id}") {{
		id
		roles {{
			id
			name
			description
		}}
	}}
}}"#
    )
}

pub fn user_groups_query(user_id: i64) -> String {
    format!(
        r#"query getUserGroups {{
	users(Query: "id={user_id}") {{
		id
		userGroups {{
			id
			name
			description
		}}
	}}
}}"#
    )
}

fn join_filters(first: &str, second: &str) -> String {
    match (first.is_empty(), second.is_empty()) {
        (true, _) => second.to_string(),
        (_, true) => first.to_string(),
        _ => format!("{first}&{second}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pagination_is_empty_only_for_first_page() {
        assert_eq!(pagination(&Cursor::first_page()), "");
        assert_eq!(pagination(&Cursor::after(7)), "id[gt]=7");
        assert_eq!(appended_pagination(&Cursor::first_page()), "");
        assert_eq!(appended_pagination(&Cursor::after(7)), "&id[gt]=7");
    }

    #[test]
    fn first_page_queries_omit_cursor_clause() {
        let users = all_users_query(&Cursor::first_page());
        assert!(users.contains(r#"users(Query: "type[blank]=true")"#));
        assert!(!users.contains("id[gt]"));

        let groups = groups_query(&Cursor::first_page());
        assert!(groups.contains(r#"userGroups(Query: "")"#));
    }

    #[test]
    fn continuing_queries_filter_by_cursor() {
        let users = all_users_query(&Cursor::after(7));
        assert!(users.contains(r#"users(Query: "id[gt]=7&type[blank]=true")"#));
        assert!(users.contains("fullname"));

        let roles = roles_query(&Cursor::after(12));
        assert!(roles.contains(r#"roles(Query: "id[gt]=12")"#));
    }

    #[test]
    fn grant_holder_queries() {
        assert!(role_grants_query(12, &Cursor::first_page())
            .contains(r#"users(Query: "roles[id]=12")"#));
        assert!(role_grants_query(12, &Cursor::after(5))
            .contains(r#"users(Query: "roles[id]=12&id[gt]=5")"#));
        assert!(license_grants_query("expense-user", &Cursor::after(5))
            .contains(r#"users(Query: "expense-user=true&id[gt]=5")"#));
    }

    #[test]
    fn single_record_queries_use_exact_id() {
        assert!(group_members_query(3).contains(r#"userGroups(Query: "id=3")"#));
        let roles = user_roles_query(5);
        assert!(roles.contains(r#"users(Query: "id=5")"#));
        assert!(roles.contains("roles {"));
        assert!(user_groups_query(5).contains("userGroups {"));
    }

    #[test]
    fn every_document_uses_capitalized_filter_argument() {
        let cursor = Cursor::after(1);
        let documents = [
            all_users_query(&cursor),
            groups_query(&cursor),
            roles_query(&cursor),
            group_members_query(1),
            role_grants_query(1, &cursor),
            license_grants_query("travel-user", &cursor),
            user_roles_query(1),
            user_groups_query(1),
        ];
        for document in documents {
            assert!(document.contains("(Query: \""), "{document}");
            assert!(!document.contains("(query:"), "{document}");
        }
    }
}
