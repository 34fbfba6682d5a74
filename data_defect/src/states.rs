//! The U.S. states (and DC) with their FIPS codes and postal abbreviations.

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub struct StateInfo {
    pub fips: u32,
    pub name: &'static str,
    pub abbr: &'static str,
}

const fn st(fips: u32, name: &'static str, abbr: &'static str) -> StateInfo {
    StateInfo { fips, name, abbr }
}

/// Ordered by FIPS code.
pub static STATES: [StateInfo; 51] = [
    st(1, "Alabama", "AL"),
    st(2, "Alaska", "AK"),
    st(4, "Arizona", "AZ"),
    st(5, "Arkansas", "AR"),
    st(6, "California", "CA"),
    st(8, "Colorado", "CO"),
    st(9, "Connecticut", "CT"),
    st(10, "Delaware", "DE"),
    st(11, "District of Columbia", "DC"),
    st(12, "Florida", "FL"),
    st(13, "Georgia", "GA"),
    st(15, "Hawaii", "HI"),
    st(16, "Idaho", "ID"),
    st(17, "Illinois", "IL"),
    st(18, "Indiana", "IN"),
    st(19, "Iowa", "IA"),
    st(20, "Kansas", "KS"),
    st(21, "Kentucky", "KY"),
    st(22, "Louisiana", "LA"),
    st(23, "Maine", "ME"),
    st(24, "Maryland", "MD"),
    st(25, "Massachusetts", "MA"),
    st(26, "Michigan", "MI"),
    st(27, "Minnesota", "MN"),
    st(28, "Mississippi", "MS"),
    st(29, "Missouri", "MO"),
    st(30, "Montana", "MT"),
    st(31, "Nebraska", "NE"),
    st(32, "Nevada", "NV"),
    st(33, "New Hampshire", "NH"),
    st(34, "New Jersey", "NJ"),
    st(35, "New Mexico", "NM"),
    st(36, "New York", "NY"),
    st(37, "North Carolina", "NC"),
    st(38, "North Dakota", "ND"),
    st(39, "Ohio", "OH"),
    st(40, "Oklahoma", "OK"),
    st(41, "Oregon", "OR"),
    st(42, "Pennsylvania", "PA"),
    st(44, "Rhode Island", "RI"),
    st(45, "South Carolina", "SC"),
    st(46, "South Dakota", "SD"),
    st(47, "Tennessee", "TN"),
    st(48, "Texas", "TX"),
    st(49, "Utah", "UT"),
    st(50, "Vermont", "VT"),
    st(51, "Virginia", "VA"),
    st(53, "Washington", "WA"),
    st(54, "West Virginia", "WV"),
    st(55, "Wisconsin", "WI"),
    st(56, "Wyoming", "WY"),
];

pub fn by_fips(fips: u32) -> Option<&'static StateInfo> {
    STATES.iter().find(|s| s.fips == fips)
}

pub fn by_abbr(abbr: &str) -> Option<&'static StateInfo> {
    let a = abbr.trim();
    STATES.iter().find(|s| s.abbr.eq_ignore_ascii_case(a))
}

/// Looks up a state by name, irrespective of the casing and of surrounding quotes.
pub fn by_name(name: &str) -> Option<&'static StateInfo> {
    let key = normalize_state_name(name);
    STATES
        .iter()
        .find(|s| normalize_state_name(s.name) == key)
}

/// Accepts a FIPS code, a postal abbreviation or a name.
pub fn lookup(key: &str) -> Option<&'static StateInfo> {
    let k = key.trim();
    if let Ok(fips) = k.parse::<u32>() {
        return by_fips(fips);
    }
    if k.len() == 2 {
        if let Some(s) = by_abbr(k) {
            return Some(s);
        }
    }
    by_name(k)
}

/// The key used to join tables on state names.
///
/// Strips whitespace and double quotes, then title-cases the name: every letter that
/// follows a non-letter is upper-cased and all the others are lower-cased
/// (`"DISTRICT OF COLUMBIA"` -> `"District Of Columbia"`).
pub fn normalize_state_name(name: &str) -> String {
    title_case(name.trim().trim_matches('"').trim())
}

fn title_case(s: &str) -> String {
    let mut res = String::with_capacity(s.len());
    let mut prev_is_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_is_alpha {
                res.extend(c.to_lowercase());
            } else {
                res.extend(c.to_uppercase());
            }
            prev_is_alpha = true;
        } else {
            res.push(c);
            prev_is_alpha = false;
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keys_are_unique_and_cross_map() {
        let fips: HashSet<u32> = STATES.iter().map(|s| s.fips).collect();
        let abbrs: HashSet<&str> = STATES.iter().map(|s| s.abbr).collect();
        let names: HashSet<String> = STATES
            .iter()
            .map(|s| normalize_state_name(s.name))
            .collect();
        assert_eq!(fips.len(), STATES.len());
        assert_eq!(abbrs.len(), STATES.len());
        assert_eq!(names.len(), STATES.len());

        for s in STATES.iter() {
            assert_eq!(by_fips(s.fips), Some(s));
            assert_eq!(by_abbr(s.abbr), Some(s));
            assert_eq!(by_name(s.name), Some(s));
            assert_eq!(lookup(&s.fips.to_string()), Some(s));
        }
    }

    #[test]
    fn title_case_matches_join_keys() {
        assert_eq!(normalize_state_name("NEW YORK"), "New York");
        assert_eq!(
            normalize_state_name("\"district of columbia\""),
            "District Of Columbia"
        );
        assert_eq!(normalize_state_name("  texas "), "Texas");
        assert_eq!(by_name("DISTRICT OF COLUMBIA").map(|s| s.fips), Some(11));
    }

    #[test]
    fn lookup_mixed_keys() {
        assert_eq!(lookup("wi").map(|s| s.name), Some("Wisconsin"));
        assert_eq!(lookup("55").map(|s| s.abbr), Some("WI"));
        assert_eq!(lookup("north carolina").map(|s| s.fips), Some(37));
        assert_eq!(lookup("3"), None);
        assert_eq!(lookup("Puerto Rico"), None);
    }
}
