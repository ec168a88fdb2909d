//! Responsive image candidate selection (`srcset`).

/// Width or density descriptor of one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Descriptor {
    /// `640w`
    Width(u32),
    /// `2x`
    Density(f32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub url: String,
    pub descriptor: Descriptor,
}

/// Parses a comma-separated candidate list. Malformed entries are skipped;
/// a bare URL counts as `1x`.
#[must_use]
pub fn parse(srcset: &str) -> Vec<Candidate> {
    srcset
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split_whitespace();
            let url = parts.next()?.to_owned();
            let descriptor = match parts.next() {
                None => Descriptor::Density(1.0),
                Some(d) => parse_descriptor(d)?,
            };
            Some(Candidate { url, descriptor })
        })
        .collect()
}

fn parse_descriptor(d: &str) -> Option<Descriptor> {
    if let Some(w) = d.strip_suffix('w') {
        w.parse().ok().filter(|&w: &u32| w > 0).map(Descriptor::Width)
    } else if let Some(x) = d.strip_suffix('x') {
        x.parse().ok().filter(|&x: &f32| x > 0.0).map(Descriptor::Density)
    } else {
        None
    }
}

/// Picks the candidate for a drawable `width` pixels wide at `pixel_ratio`.
///
/// Width candidates: the narrowest at least `width` wide, else the widest.
/// Density candidates: the lowest at least `pixel_ratio`, else the highest.
/// Width descriptors win when both kinds are present.
#[must_use]
pub fn resolve(srcset: &str, width: u32, pixel_ratio: f32) -> Option<String> {
    let candidates = parse(srcset);

    let mut widths: Vec<(u32, &str)> = candidates
        .iter()
        .filter_map(|c| match c.descriptor {
            Descriptor::Width(w) => Some((w, c.url.as_str())),
            Descriptor::Density(_) => None,
        })
        .collect();
    if !widths.is_empty() {
        widths.sort_by_key(|&(w, _)| w);
        let pick = widths
            .iter()
            .find(|&&(w, _)| w >= width)
            .or_else(|| widths.last())?;
        return Some(pick.1.to_owned());
    }

    let mut densities: Vec<(f32, &str)> = candidates
        .iter()
        .filter_map(|c| match c.descriptor {
            Descriptor::Density(x) => Some((x, c.url.as_str())),
            Descriptor::Width(_) => None,
        })
        .collect();
    densities.sort_by(|a, b| a.0.total_cmp(&b.0));
    let pick = densities
        .iter()
        .find(|&&(x, _)| x >= pixel_ratio)
        .or_else(|| densities.last())?;
    Some(pick.1.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_descriptors() {
        let parsed = parse("a.webp 640w, b.webp 2x, c.webp, broken 12q");
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].descriptor, Descriptor::Width(640));
        assert_eq!(parsed[1].descriptor, Descriptor::Density(2.0));
        assert_eq!(parsed[2].descriptor, Descriptor::Density(1.0));
    }

    #[test]
    fn picks_narrowest_covering_width() {
        let set = "s.webp 640w, l.webp 1920w, m.webp 1280w";
        assert_eq!(resolve(set, 1000, 1.0).as_deref(), Some("m.webp"));
        assert_eq!(resolve(set, 640, 1.0).as_deref(), Some("s.webp"));
    }

    #[test]
    fn falls_back_to_widest() {
        assert_eq!(resolve("s.webp 640w, m.webp 1280w", 4000, 1.0).as_deref(), Some("m.webp"));
    }

    #[test]
    fn density_candidates_follow_pixel_ratio() {
        let set = "one.webp 1x, two.webp 2x";
        assert_eq!(resolve(set, 800, 1.5).as_deref(), Some("two.webp"));
        assert_eq!(resolve(set, 800, 1.0).as_deref(), Some("one.webp"));
        assert_eq!(resolve(set, 800, 3.0).as_deref(), Some("two.webp"));
    }

    #[test]
    fn empty_set_resolves_nothing() {
        assert_eq!(resolve("  ", 800, 1.0), None);
    }
}
