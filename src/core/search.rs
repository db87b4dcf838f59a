//! Case-insensitive text search over books and members

use crate::types::{Book, Member};

/// Entities that can be matched by free-text search
pub trait Searchable {
    /// Text fields a query is matched against
    fn search_fields(&self) -> Vec<&str>;

    /// Whether any field contains `needle`, which must already be lowercase
    fn matches(&self, needle: &str) -> bool {
        self.search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

impl Searchable for Book {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str(), self.author.as_str()];
        if let Some(genre) = &self.genre {
            fields.push(genre);
        }
        fields
    }
}

impl Searchable for Member {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.email.as_str()]
    }
}

/// Filter `items` down to those matching `query`
///
/// Matching is a case-insensitive substring test over each item's search
/// fields. Relative order is preserved; an empty query keeps everything.
pub fn search<'a, T, I>(items: I, query: &str) -> Vec<&'a T>
where
    T: Searchable + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let needle = query.trim().to_lowercase();
    items
        .into_iter()
        .filter(|item| item.matches(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MembershipStatus;
    use rstest::rstest;

    fn book(id: u64, title: &str, author: &str, genre: Option<&str>) -> Book {
        Book {
            id,
            title: title.to_string(),
            author: author.to_string(),
            genre: genre.map(str::to_string),
            isbn: None,
            year_published: None,
            total_copies: 1,
            available_copies: 1,
        }
    }

    fn member(id: u64, name: &str, email: &str) -> Member {
        Member {
            id,
            name: name.to_string(),
            email: email.to_string(),
            phone: Some("555-0100".to_string()),
            address: None,
            membership_status: MembershipStatus::Active,
            registration_date: None,
        }
    }

    fn catalog() -> Vec<Book> {
        vec![
            book(1, "The Great Gatsby", "F. Scott Fitzgerald", Some("Fiction")),
            book(2, "Dune", "Frank Herbert", Some("Science Fiction")),
            book(3, "A Brief History of Time", "Stephen Hawking", None),
            book(4, "Fire and Blood", "George R. R. Martin", Some("Fantasy")),
        ]
    }

    #[rstest]
    #[case::title("gatsby", vec![1])]
    #[case::author_mixed_case("HERBERT", vec![2])]
    #[case::genre("fiction", vec![1, 2])]
    #[case::substring_across_fields("fi", vec![1, 2, 4])]
    #[case::no_match("cookbook", vec![])]
    #[case::empty_query("", vec![1, 2, 3, 4])]
    #[case::padded_query("  dune ", vec![2])]
    fn test_search_books(#[case] query: &str, #[case] expected: Vec<u64>) {
        let books = catalog();
        let ids: Vec<u64> = search(&books, query).iter().map(|b| b.id).collect();
        assert_eq!(ids, expected);
    }

    #[rstest]
    #[case::name("grace", vec![2])]
    #[case::email_domain("EXAMPLE.ORG", vec![1, 2])]
    #[case::phone_is_not_searched("555", vec![])]
    fn test_search_members(#[case] query: &str, #[case] expected: Vec<u64>) {
        let members = vec![
            member(1, "Ada Lovelace", "ada@example.org"),
            member(2, "Grace Hopper", "grace@example.org"),
            member(3, "Alan Turing", "alan@example.com"),
        ];
        let ids: Vec<u64> = search(&members, query).iter().map(|m| m.id).collect();
        assert_eq!(ids, expected);
    }
}
