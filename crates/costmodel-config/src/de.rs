//! Order-preserving deserialization of section documents.

use std::fmt;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};

use crate::{ConfigTree, ConfigValue, Entry, Section};

impl<'de> Deserialize<'de> for ConfigTree {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(TreeVisitor)
    }
}

struct TreeVisitor;

impl<'de> Visitor<'de> for TreeVisitor {
    type Value = ConfigTree;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of sections")
    }

    fn visit_unit<E>(self) -> Result<ConfigTree, E> {
        Ok(ConfigTree::new())
    }

    fn visit_map<A>(self, mut map: A) -> Result<ConfigTree, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut tree = ConfigTree::new();
        while let Some((name, SectionEntries(entries))) =
            map.next_entry::<String, SectionEntries>()?
        {
            tree.push_section(Section { name, entries });
        }
        Ok(tree)
    }
}

struct SectionEntries(Vec<Entry>);

impl<'de> Deserialize<'de> for SectionEntries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(EntriesVisitor)
    }
}

struct EntriesVisitor;

impl<'de> Visitor<'de> for EntriesVisitor {
    type Value = SectionEntries;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a section table of scalar values")
    }

    // `Section:` with no body in YAML.
    fn visit_unit<E>(self) -> Result<SectionEntries, E> {
        Ok(SectionEntries(Vec::new()))
    }

    fn visit_map<A>(self, mut map: A) -> Result<SectionEntries, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::new();
        while let Some((key, value)) = map.next_entry::<String, ConfigValue>()? {
            entries.push(Entry { key, value });
        }
        Ok(SectionEntries(entries))
    }
}
