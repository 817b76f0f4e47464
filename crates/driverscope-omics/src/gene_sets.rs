//! Externally supplied pathway gene sets.

use anyhow::{bail, Result};
use std::collections::{BTreeMap, BTreeSet};

/// pathway_id → member genes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneSetCollection {
    sets: BTreeMap<String, BTreeSet<String>>,
}

impl GeneSetCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pathway_id: impl Into<String>, genes: impl IntoIterator<Item = String>) {
        self.sets.entry(pathway_id.into()).or_default().extend(genes);
    }

    pub fn get(&self, pathway_id: &str) -> Option<&BTreeSet<String>> {
        self.sets.get(pathway_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.sets.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Parse GMT: `name<TAB>description<TAB>gene<TAB>gene...` per line.
    pub fn parse_gmt(content: &str, source: &str) -> Result<Self> {
        let mut out = Self::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim_end_matches(['\r', '\n']);
            if trimmed.trim().is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = trimmed.split('\t').collect();
            if parts.len() < 3 {
                bail!("{}:{} malformed GMT line (expected name, description, genes)", source, idx + 1);
            }
            let name = parts[0].trim();
            if name.is_empty() {
                bail!("{}:{} empty gene set name", source, idx + 1);
            }
            let genes = parts[2..]
                .iter()
                .map(|g| g.trim())
                .filter(|g| !g.is_empty())
                .map(str::to_string);
            out.insert(name, genes);
        }
        Ok(out)
    }

    /// Parse a two-column `pathway_id, gene_id` table with a header row.
    pub fn parse_pairs(content: &str, delimiter: u8, source: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());
        let mut out = Self::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            let (Some(pathway), Some(gene)) = (record.get(0), record.get(1)) else {
                bail!("{}:{} expected pathway_id and gene_id columns", source, idx + 2);
            };
            let (pathway, gene) = (pathway.trim(), gene.trim());
            if pathway.is_empty() || gene.is_empty() {
                continue;
            }
            out.insert(pathway, [gene.to_string()]);
        }
        Ok(out)
    }
}

impl FromIterator<(String, BTreeSet<String>)> for GeneSetCollection {
    fn from_iter<I: IntoIterator<Item = (String, BTreeSet<String>)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (k, v) in iter {
            out.insert(k, v);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gmt() {
        let gmt = "WNT_SIGNALING\thttp://x\tCTNNB1\tAXIN1\tAPC\n\
                   # comment\n\
                   P53_PATHWAY\tna\tTP53\tMDM2\t\n";
        let sets = GeneSetCollection::parse_gmt(gmt, "test.gmt").unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets.get("WNT_SIGNALING").unwrap().len(), 3);
        assert!(sets.get("P53_PATHWAY").unwrap().contains("MDM2"));
    }

    #[test]
    fn test_parse_gmt_rejects_short_line() {
        assert!(GeneSetCollection::parse_gmt("ONLY_NAME\n", "bad.gmt").is_err());
    }

    #[test]
    fn test_parse_pairs() {
        let csv = "pathway_id,gene_id\nCELL_CYCLE,CDK4\nCELL_CYCLE,CCND1\nAPOPTOSIS,BCL2\n";
        let sets = GeneSetCollection::parse_pairs(csv, b',', "sets.csv").unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets.get("CELL_CYCLE").unwrap().len(), 2);
    }
}
