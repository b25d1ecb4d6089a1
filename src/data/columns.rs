// ---------------------------------------------------------------------------
// Column detection by header keywords
// ---------------------------------------------------------------------------

const DISTRICT_KEYWORDS: &[&str] = &["鄉鎮市區", "行政區"];
const ADDRESS_KEYWORDS: &[&str] = &["土地位置", "建物門牌"];
const PRICE_KEYWORDS: &[&str] = &["總價元"];

/// Header indices for the three columns the analysis cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnRoles {
    pub district: Option<usize>,
    pub address: Option<usize>,
    pub price: Option<usize>,
}

impl ColumnRoles {
    pub fn detect<S: AsRef<str>>(headers: &[S]) -> Self {
        ColumnRoles {
            district: find_column(headers, DISTRICT_KEYWORDS),
            address: find_column(headers, ADDRESS_KEYWORDS),
            price: find_column(headers, PRICE_KEYWORDS),
        }
    }
}

/// First header (in file order) containing any of the keywords.
fn find_column<S: AsRef<str>>(headers: &[S], keywords: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| keywords.iter().any(|k| h.as_ref().contains(k)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_registry_headers() {
        let headers = [
            "鄉鎮市區",
            "交易標的",
            "土地位置建物門牌",
            "總價元",
            "單價元平方公尺",
        ];
        let roles = ColumnRoles::detect(&headers);
        assert_eq!(roles.district, Some(0));
        assert_eq!(roles.address, Some(2));
        assert_eq!(roles.price, Some(3));
    }

    #[test]
    fn first_matching_header_wins() {
        let headers = ["行政區代碼", "行政區"];
        assert_eq!(ColumnRoles::detect(&headers).district, Some(0));
    }

    #[test]
    fn missing_roles_are_none() {
        let roles = ColumnRoles::detect(&["name", "value"]);
        assert_eq!(roles, ColumnRoles::default());
    }
}
