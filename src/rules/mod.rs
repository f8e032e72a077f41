pub mod compiler;
pub mod engine;
pub mod model;

pub use compiler::{
    compile_rules, CompileInput, CompiledRules, DEFAULT_MAX_RULES, PRIORITY_ALLOW,
    PRIORITY_DOMAIN_BLOCK, PRIORITY_PATTERN_BLOCK, RULE_ID_OFFSET,
};
pub use engine::{BlockingRules, LocalRuleEngine, RuleEngine};
pub use model::{DomainType, ResourceType, Rule, RuleAction, RuleCondition};
