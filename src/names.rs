use crate::types::{DecodedCsr, NameAttribute, SubjectName};
use der_parser::asn1_rs::Tag;
use der_parser::oid::Oid;

/// Short label and description for well-known name attribute types.
pub fn attribute_label(oid: &Oid<'_>) -> Option<(&'static str, &'static str)> {
    let label = match oid.to_id_string().as_str() {
        "2.5.4.6" => ("C", "Country"),
        "2.5.4.8" => ("ST", "State or province"),
        "2.5.4.7" => ("L", "Locality"),
        "2.5.4.10" => ("O", "Organization"),
        "2.5.4.11" => ("OU", "Organizational unit"),
        "2.5.4.3" => ("CN", "Common name"),
        "1.2.840.113549.1.9.1" => ("E", "Email address"),
        "2.5.4.9" => ("STREET", "Street address"),
        "2.5.4.5" => ("SERIALNUMBER", "Serial number"),
        "2.5.4.12" => ("T", "Title"),
        "2.5.4.4" => ("SURNAME", "Surname"),
        "2.5.4.42" => ("GIVENNAME", "Given name"),
        "2.5.4.43" => ("INITIALS", "Initials"),
        "2.5.4.44" => ("GENERATION", "Generation qualifier"),
        "2.5.4.46" => ("DNQ", "Distinguished name qualifier"),
        "2.5.4.17" => ("POSTALCODE", "Postal code"),
        "2.5.4.15" => ("BUSINESSCATEGORY", "Business category"),
        "2.5.4.65" => ("PSEUDONYM", "Pseudonym"),
        "0.9.2342.19200300.100.1.25" => ("DC", "Domain component"),
        "0.9.2342.19200300.100.1.1" => ("UID", "User ID"),
        _ => return None,
    };
    Some(label)
}

/// Label for an attribute type; unknown types use their dotted form.
pub fn label_for(oid: &Oid<'_>) -> String {
    match attribute_label(oid) {
        Some((short, _)) => short.to_string(),
        None => oid.to_id_string(),
    }
}

/// String form of an attribute value.
///
/// Character string types are decoded; anything else becomes `#` followed by the hex of its
/// content octets.
pub fn attribute_value_string(attr: &NameAttribute) -> String {
    match attr.tag {
        Tag::Utf8String
        | Tag::PrintableString
        | Tag::Ia5String
        | Tag::NumericString
        | Tag::VisibleString
        | Tag::TeletexString
        | Tag::GeneralString
        | Tag::GraphicString => String::from_utf8_lossy(&attr.value).into_owned(),
        Tag::BmpString => {
            let units: Vec<u16> = attr
                .value
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        Tag::UniversalString => attr
            .value
            .chunks_exact(4)
            .map(|c| {
                char::from_u32(u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                    .unwrap_or(char::REPLACEMENT_CHARACTER)
            })
            .collect(),
        _ => format!("#{}", hex::encode(&attr.value)),
    }
}

/// One relative distinguished name: labels and values in encoded order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RdnGroup {
    pub entries: Vec<(String, String)>,
}

impl RdnGroup {
    /// First value recorded under `label`.
    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistinguishedNameProjection {
    pub groups: Vec<RdnGroup>,
}

impl DistinguishedNameProjection {
    /// First value for `label` across all groups.
    pub fn find(&self, label: &str) -> Option<&str> {
        self.groups.iter().find_map(|g| g.get(label))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RdnGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

pub fn project_name(name: &SubjectName) -> DistinguishedNameProjection {
    let groups = name
        .rdns
        .iter()
        .map(|rdn| RdnGroup {
            entries: rdn
                .attributes
                .iter()
                .map(|attr| (label_for(&attr.oid), attribute_value_string(attr)))
                .collect(),
        })
        .collect();

    DistinguishedNameProjection { groups }
}

/// Flattens the subject into one group per RDN, multi-valued RDNs kept together.
pub fn project_subject_name(csr: &DecodedCsr) -> DistinguishedNameProjection {
    project_name(csr.subject())
}

fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        let leading = i == 0 && (c == '#' || c == ' ');
        if leading || matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Renders a name on one line in encoded order, e.g. `C=EN,O=Wikipedia,CN=*.wikipedia.org`.
/// Members of a multi-valued RDN are joined with `+`.
pub fn name_to_string(name: &SubjectName) -> String {
    project_name(name)
        .groups
        .iter()
        .map(|group| {
            group
                .iter()
                .map(|(label, value)| format!("{}={}", label, escape_value(value)))
                .collect::<Vec<_>>()
                .join("+")
        })
        .collect::<Vec<_>>()
        .join(",")
}

pub fn subject_string(csr: &DecodedCsr) -> String {
    name_to_string(csr.subject())
}
