//! The attribute map: a port's metadata, as extracted from the ports
//! tree's build files by one `make -V <VAR>` per field (§4.5).

use crate::core::origin::{strip_tree_root, Origin};

/// One field of the attribute map, in the order its `-V` argument is
/// emitted and its corresponding output line is parsed. Keeping the
/// request order and the parse order on the same declarative list (as
/// the source's `ports_attr` table does) is what keeps the two in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Version,
    Revision,
    Epoch,
    Pkgname,
    Prefix,
    Suffix,
    Categories,
    Comment,
    Maintainer,
    Options,
    Distfiles,
    Distdir,
    DependBuild,
    DependExtract,
    DependFetch,
    DependLib,
    DependRun,
    DependPatch,
    Depends,
    Descr,
    Conflicts,
    NoPackage,
    Interactive,
    Makefiles,
    Optionsfile,
    Pkgdir,
    Wrkdir,
    JobsFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Stripped string.
    Str,
    /// Whitespace-split into a tuple.
    Tuple,
    /// Non-empty-is-true.
    Bool,
    /// `field:origin` pairs, origin stripped of the tree root.
    DependPairs,
    /// Whitespace-split, then each entry truncated at its first `:`.
    Distfiles,
    /// Whitespace-split, deduplicated, each entry stripped of the tree
    /// root.
    OriginList,
}

impl Field {
    pub const ORDER: [Field; 28] = [
        Field::Name,
        Field::Version,
        Field::Revision,
        Field::Epoch,
        Field::Pkgname,
        Field::Prefix,
        Field::Suffix,
        Field::Categories,
        Field::Comment,
        Field::Maintainer,
        Field::Options,
        Field::Distfiles,
        Field::Distdir,
        Field::DependBuild,
        Field::DependExtract,
        Field::DependFetch,
        Field::DependLib,
        Field::DependRun,
        Field::DependPatch,
        Field::Depends,
        Field::Descr,
        Field::Conflicts,
        Field::NoPackage,
        Field::Interactive,
        Field::Makefiles,
        Field::Optionsfile,
        Field::Pkgdir,
        Field::Wrkdir,
        Field::JobsFlags,
    ];

    /// The `make -V` variable name backing this field.
    pub fn var(self) -> &'static str {
        match self {
            Field::Name => "PORTNAME",
            Field::Version => "PORTVERSION",
            Field::Revision => "PORTREVISION",
            Field::Epoch => "PORTEPOCH",
            Field::Pkgname => "PKGNAME",
            Field::Prefix => "PKGNAMEPREFIX",
            Field::Suffix => "PKGNAMESUFFIX",
            Field::Categories => "CATEGORIES",
            Field::Comment => "COMMENT",
            Field::Maintainer => "MAINTAINER",
            Field::Options => "OPTIONS",
            Field::Distfiles => "DISTFILES",
            Field::Distdir => "DISTDIR",
            Field::DependBuild => "BUILD_DEPENDS",
            Field::DependExtract => "EXTRACT_DEPENDS",
            Field::DependFetch => "FETCH_DEPENDS",
            Field::DependLib => "LIB_DEPENDS",
            Field::DependRun => "RUN_DEPENDS",
            Field::DependPatch => "PATCH_DEPENDS",
            Field::Depends => "_DEPEND_DIRS",
            Field::Descr => "_DESCR",
            Field::Conflicts => "CONFLICTS",
            Field::NoPackage => "NO_PACKAGE",
            Field::Interactive => "IS_INTERACTIVE",
            Field::Makefiles => "MAKEFILE_LIST",
            Field::Optionsfile => "OPTIONS_FILE",
            Field::Pkgdir => "PKGDIR",
            Field::Wrkdir => "WRKDIR",
            Field::JobsFlags => "MAKE_JOBS_NUMBER",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::Name
            | Field::Version
            | Field::Revision
            | Field::Epoch
            | Field::Pkgname
            | Field::Prefix
            | Field::Suffix
            | Field::Comment
            | Field::Maintainer
            | Field::Distdir
            | Field::Descr
            | Field::Optionsfile
            | Field::Pkgdir
            | Field::Wrkdir
            | Field::JobsFlags => FieldKind::Str,
            Field::Categories | Field::Options | Field::Conflicts | Field::Makefiles => {
                FieldKind::Tuple
            }
            Field::Distfiles => FieldKind::Distfiles,
            Field::DependBuild
            | Field::DependExtract
            | Field::DependFetch
            | Field::DependLib
            | Field::DependRun
            | Field::DependPatch => FieldKind::DependPairs,
            Field::Depends => FieldKind::OriginList,
            Field::NoPackage | Field::Interactive => FieldKind::Bool,
        }
    }
}

/// A single `field:origin` dependency entry, as declared by the port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependEntry {
    pub field: String,
    pub origin: Origin,
}

/// The fully parsed, immutable attribute map for one port.
#[derive(Debug, Clone)]
pub struct Attributes {
    pub name: String,
    pub version: String,
    pub revision: String,
    pub epoch: String,
    pub pkgname: String,
    pub prefix: String,
    pub suffix: String,
    pub categories: Vec<String>,
    pub comment: String,
    pub maintainer: String,
    pub options: Vec<String>,
    pub distfiles: Vec<String>,
    pub distdir: String,
    pub depend_build: Vec<DependEntry>,
    pub depend_extract: Vec<DependEntry>,
    pub depend_fetch: Vec<DependEntry>,
    pub depend_lib: Vec<DependEntry>,
    pub depend_run: Vec<DependEntry>,
    pub depend_patch: Vec<DependEntry>,
    pub depends: Vec<Origin>,
    pub descr: String,
    pub conflicts: Vec<String>,
    pub no_package: bool,
    pub interactive: bool,
    pub makefiles: Vec<String>,
    pub optionsfile: String,
    pub pkgdir: String,
    pub wrkdir: String,
    pub jobs_flags: String,
}

impl Attributes {
    /// Every distinct dependency origin this port mentions, across all
    /// six kinds plus the raw `depends` list — the set the cache
    /// recursively `add`s on successful construction.
    pub fn dependency_origins(&self) -> Vec<Origin> {
        let mut origins: Vec<Origin> = self.depends.clone();
        for list in [
            &self.depend_build,
            &self.depend_extract,
            &self.depend_fetch,
            &self.depend_lib,
            &self.depend_run,
            &self.depend_patch,
        ] {
            origins.extend(list.iter().map(|e| e.origin.clone()));
        }
        origins.sort();
        origins.dedup();
        origins
    }

    pub fn depends_of(&self, kind: crate::core::stage::DependKind) -> &[DependEntry] {
        use crate::core::stage::DependKind::*;
        match kind {
            Build => &self.depend_build,
            Extract => &self.depend_extract,
            Fetch => &self.depend_fetch,
            Lib => &self.depend_lib,
            Run => &self.depend_run,
            Patch => &self.depend_patch,
        }
    }

    /// Parses the line-per-`-V` output of an attribute query, in
    /// `Field::ORDER`, applying each field's declared transforms.
    pub fn from_lines(tree_root: &str, lines: &[String]) -> Attributes {
        let mut raw: Vec<&str> = lines.iter().map(String::as_str).collect();
        raw.resize(Field::ORDER.len(), "");

        let str_field = |f: Field| raw[Field::ORDER.iter().position(|x| *x == f).unwrap()].trim();
        let tuple_field = |f: Field| -> Vec<String> {
            str_field(f).split_whitespace().map(str::to_string).collect()
        };
        let bool_field = |f: Field| !str_field(f).is_empty();
        let dep_pairs = |f: Field| -> Vec<DependEntry> {
            tuple_field(f)
                .into_iter()
                .filter_map(|entry| {
                    let (field, origin) = entry.split_once(':')?;
                    Some(DependEntry {
                        field: field.trim().to_string(),
                        origin: Origin::new(strip_tree_root(tree_root, origin.trim())),
                    })
                })
                .collect()
        };

        let distfiles = tuple_field(Field::Distfiles)
            .into_iter()
            .map(|entry| entry.split(':').next().unwrap_or(&entry).to_string())
            .collect();

        let mut depends: Vec<Origin> = tuple_field(Field::Depends)
            .into_iter()
            .map(|p| Origin::new(strip_tree_root(tree_root, &p)))
            .collect();
        depends.sort();
        depends.dedup();

        Attributes {
            name: str_field(Field::Name).to_string(),
            version: str_field(Field::Version).to_string(),
            revision: str_field(Field::Revision).to_string(),
            epoch: str_field(Field::Epoch).to_string(),
            pkgname: str_field(Field::Pkgname).to_string(),
            prefix: str_field(Field::Prefix).to_string(),
            suffix: str_field(Field::Suffix).to_string(),
            categories: tuple_field(Field::Categories),
            comment: str_field(Field::Comment).to_string(),
            maintainer: str_field(Field::Maintainer).to_string(),
            options: tuple_field(Field::Options),
            distfiles,
            distdir: str_field(Field::Distdir).to_string(),
            depend_build: dep_pairs(Field::DependBuild),
            depend_extract: dep_pairs(Field::DependExtract),
            depend_fetch: dep_pairs(Field::DependFetch),
            depend_lib: dep_pairs(Field::DependLib),
            depend_run: dep_pairs(Field::DependRun),
            depend_patch: dep_pairs(Field::DependPatch),
            depends,
            descr: str_field(Field::Descr).to_string(),
            conflicts: tuple_field(Field::Conflicts),
            no_package: bool_field(Field::NoPackage),
            interactive: bool_field(Field::Interactive),
            makefiles: tuple_field(Field::Makefiles),
            optionsfile: str_field(Field::Optionsfile).to_string(),
            pkgdir: str_field(Field::Pkgdir).to_string(),
            wrkdir: str_field(Field::Wrkdir).to_string(),
            jobs_flags: str_field(Field::JobsFlags).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_for(field: Field, value: &str) -> String {
        let _ = field;
        value.to_string()
    }

    #[test]
    fn parses_a_full_fixture_in_declared_order() {
        let tree_root = "/usr/ports";
        let lines: Vec<String> = Field::ORDER
            .iter()
            .map(|f| match f {
                Field::Name => line_for(*f, "nginx"),
                Field::Version => line_for(*f, "1.2.3"),
                Field::Pkgname => line_for(*f, "nginx-1.2.3"),
                Field::Categories => line_for(*f, "www net"),
                Field::DependLib => line_for(*f, "lib:/usr/ports/security/openssl lib:/usr/ports/security/openssl"),
                Field::DependRun => line_for(*f, "run:/usr/ports/www/nginx-conf"),
                Field::Depends => line_for(
                    *f,
                    "/usr/ports/security/openssl /usr/ports/www/nginx-conf",
                ),
                Field::Distfiles => line_for(*f, "nginx-1.2.3.tar.gz:source"),
                _ => String::new(),
            })
            .collect();

        let attrs = Attributes::from_lines(tree_root, &lines);
        assert_eq!(attrs.name, "nginx");
        assert_eq!(attrs.pkgname, "nginx-1.2.3");
        assert_eq!(attrs.categories, vec!["www", "net"]);
        assert_eq!(attrs.distfiles, vec!["nginx-1.2.3.tar.gz"]);
        assert_eq!(attrs.depend_lib.len(), 2);
        assert_eq!(attrs.depend_lib[0].origin.as_str(), "security/openssl");
        assert_eq!(attrs.dependency_origins().len(), 2);
    }

    #[test]
    fn bool_field_is_true_only_when_non_empty() {
        let mut lines = vec![String::new(); Field::ORDER.len()];
        lines[Field::ORDER.iter().position(|f| *f == Field::NoPackage).unwrap()] =
            "yes".to_string();
        let attrs = Attributes::from_lines("/usr/ports", &lines);
        assert!(attrs.no_package);
        assert!(!attrs.interactive);
    }
}
