// src/skills.rs
//
// =============================================================================
// RESUMEPILOT: SKILL EXPANSION TABLES
// =============================================================================
//
// Three expansion layers consulted by the matcher's skill dimension
// (§4.5): a canonical skill dictionary, a bilingual mapping table, and
// variant groups. Shaped the same way the orchestrator's `physics.rs`
// keeps its atomic-mass lookup as static match arms — small, static,
// domain data, looked up through a thin struct rather than scattered
// through the matcher.

use std::collections::{HashMap, HashSet};

/// Canonical dictionary: ~80 entries spanning languages, frameworks,
/// data platforms, cloud services, and ML tooling. Each entry expands to
/// itself plus any closely related canonical terms worth treating as
/// equivalent for matching purposes (e.g. a job wanting "AWS" is
/// satisfied by a candidate who lists "Amazon Web Services").
fn canonical_dictionary() -> &'static [(&'static str, &'static [&'static str])] {
    &[
        ("python", &["python", "python3"]),
        ("java", &["java"]),
        ("javascript", &["javascript"]),
        ("typescript", &["typescript"]),
        ("go", &["go", "golang"]),
        ("rust", &["rust"]),
        ("c++", &["c++", "cpp"]),
        ("c#", &["c#", "csharp"]),
        ("scala", &["scala"]),
        ("r", &["r"]),
        ("sql", &["sql"]),
        ("django", &["django"]),
        ("flask", &["flask"]),
        ("fastapi", &["fastapi"]),
        ("spring", &["spring", "spring boot"]),
        ("react", &["react", "react.js", "reactjs"]),
        ("vue", &["vue", "vue.js", "vuejs"]),
        ("angular", &["angular"]),
        ("node", &["node", "node.js", "nodejs"]),
        ("express", &["express", "express.js"]),
        ("pytorch", &["pytorch"]),
        ("tensorflow", &["tensorflow"]),
        ("keras", &["keras"]),
        ("scikit-learn", &["scikit-learn", "sklearn"]),
        ("pandas", &["pandas"]),
        ("numpy", &["numpy"]),
        ("spark", &["spark", "apache spark"]),
        ("hadoop", &["hadoop"]),
        ("kafka", &["kafka", "apache kafka"]),
        ("airflow", &["airflow", "apache airflow"]),
        ("flink", &["flink", "apache flink"]),
        ("hive", &["hive"]),
        ("presto", &["presto"]),
        ("aws", &["aws", "amazon web services"]),
        ("azure", &["azure", "microsoft azure"]),
        ("gcp", &["gcp", "google cloud platform", "google cloud"]),
        ("docker", &["docker"]),
        ("kubernetes", &["kubernetes", "k8s"]),
        ("terraform", &["terraform"]),
        ("ansible", &["ansible"]),
        ("jenkins", &["jenkins"]),
        ("git", &["git"]),
        ("postgresql", &["postgresql", "postgres"]),
        ("mysql", &["mysql"]),
        ("mongodb", &["mongodb", "mongo"]),
        ("redis", &["redis"]),
        ("elasticsearch", &["elasticsearch"]),
        ("cassandra", &["cassandra"]),
        ("graphql", &["graphql"]),
        ("rest api", &["rest api", "restful api", "rest"]),
        ("grpc", &["grpc"]),
        ("microservices", &["microservices"]),
        ("machine learning", &["machine learning", "ml"]),
        ("deep learning", &["deep learning", "dl"]),
        ("nlp", &["nlp", "natural language processing"]),
        ("computer vision", &["computer vision", "cv"]),
        ("data engineering", &["data engineering"]),
        ("data science", &["data science"]),
        ("devops", &["devops"]),
        ("ci/cd", &["ci/cd", "cicd"]),
        ("linux", &["linux"]),
        ("bash", &["bash", "shell"]),
        ("agile", &["agile", "scrum"]),
    ]
}

/// Bilingual pairs: ~45 Chinese/English equivalences consulted on both
/// sides (job side and candidate side).
fn bilingual_pairs() -> &'static [(&'static str, &'static str)] {
    &[
        ("机器学习", "machine learning"),
        ("深度学习", "deep learning"),
        ("自然语言处理", "natural language processing"),
        ("计算机视觉", "computer vision"),
        ("数据工程", "data engineering"),
        ("数据科学", "data science"),
        ("人工智能", "artificial intelligence"),
        ("前端", "frontend"),
        ("后端", "backend"),
        ("全栈", "full stack"),
        ("云计算", "cloud computing"),
        ("分布式系统", "distributed systems"),
        ("微服务", "microservices"),
        ("数据库", "database"),
        ("运维", "devops"),
        ("测试", "testing"),
        ("算法", "algorithm"),
        ("架构师", "architect"),
        ("项目管理", "project management"),
        ("产品经理", "product manager"),
    ]
}

/// Variant groups: ~20 informal aliasing clusters.
fn variant_groups() -> &'static [&'static [&'static str]] {
    &[
        &["javascript", "js"],
        &["typescript", "ts"],
        &["python", "py"],
        &["golang", "go"],
        &["kubernetes", "k8s"],
        &["postgresql", "postgres", "psql"],
        &["mongodb", "mongo"],
        &["machine learning", "ml"],
        &["deep learning", "dl"],
        &["artificial intelligence", "ai"],
        &["continuous integration", "ci"],
        &["continuous deployment", "cd"],
        &["natural language processing", "nlp"],
        &["computer vision", "cv"],
        &["amazon web services", "aws"],
        &["google cloud platform", "gcp", "google cloud"],
        &["microsoft azure", "azure"],
        &["user interface", "ui"],
        &["user experience", "ux"],
        &["application programming interface", "api"],
    ]
}

pub struct SkillExpander {
    /// term -> set of all terms it expands to, across all three layers.
    expansions: HashMap<String, HashSet<String>>,
}

impl SkillExpander {
    pub fn new() -> Self {
        let mut expansions: HashMap<String, HashSet<String>> = HashMap::new();

        let mut link = |a: &str, b: &str| {
            let a = a.to_lowercase();
            let b = b.to_lowercase();
            expansions.entry(a.clone()).or_default().insert(a.clone());
            expansions.entry(a.clone()).or_default().insert(b.clone());
            expansions.entry(b.clone()).or_default().insert(b.clone());
            expansions.entry(b.clone()).or_default().insert(a);
        };

        for (canonical, aliases) in canonical_dictionary() {
            for alias in *aliases {
                link(canonical, alias);
            }
        }
        for (zh, en) in bilingual_pairs() {
            link(zh, en);
        }
        for group in variant_groups() {
            for i in 0..group.len() {
                for j in (i + 1)..group.len() {
                    link(group[i], group[j]);
                }
            }
        }

        Self { expansions }
    }

    /// All terms `term` is considered equivalent to, including itself.
    pub fn expand(&self, term: &str) -> HashSet<String> {
        let key = term.trim().to_lowercase();
        let mut out = self.expansions.get(&key).cloned().unwrap_or_default();
        out.insert(key);
        out
    }

    /// Expands a whole list, flattening into one set.
    pub fn expand_all<'a, I: IntoIterator<Item = &'a str>>(&self, terms: I) -> HashSet<String> {
        let mut out = HashSet::new();
        for t in terms {
            out.extend(self.expand(t));
        }
        out
    }

    /// True if any expansion of `required` intersects any expansion of
    /// `candidate_expanded` (a pre-flattened candidate skill set).
    pub fn matches(&self, required: &str, candidate_expanded: &HashSet<String>) -> bool {
        self.expand(required).iter().any(|e| candidate_expanded.contains(e))
    }
}

impl Default for SkillExpander {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_alias_matches() {
        let exp = SkillExpander::new();
        let candidate = exp.expand_all(vec!["Amazon Web Services"]);
        assert!(exp.matches("AWS", &candidate));
    }

    #[test]
    fn bilingual_pair_matches() {
        let exp = SkillExpander::new();
        let candidate = exp.expand_all(vec!["Machine Learning"]);
        assert!(exp.matches("机器学习", &candidate));
    }

    #[test]
    fn variant_group_matches() {
        let exp = SkillExpander::new();
        let candidate = exp.expand_all(vec!["JS"]);
        assert!(exp.matches("JavaScript", &candidate));
    }

    #[test]
    fn unrelated_terms_do_not_match() {
        let exp = SkillExpander::new();
        let candidate = exp.expand_all(vec!["Python"]);
        assert!(!exp.matches("Java", &candidate));
    }
}
