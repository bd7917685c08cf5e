use crate::agents::Agent;
use std::collections::HashMap;
use std::sync::Arc;

pub struct AgentRegistry {
    agents: Vec<Arc<dyn Agent>>,
    agents_by_name: HashMap<String, Arc<dyn Agent>>,
    agents_by_dimension: HashMap<String, Vec<Arc<dyn Agent>>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: Vec::new(),
            agents_by_name: HashMap::new(),
            agents_by_dimension: HashMap::new(),
        }
    }

    pub fn register(&mut self, agent: Arc<dyn Agent>) {
        let name = agent.name().to_string();

        self.agents.push(agent.clone());
        self.agents_by_name.insert(name, agent.clone());
        for dimension in agent.dimensions() {
            self.agents_by_dimension
                .entry(dimension.to_string())
                .or_default()
                .push(agent.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents_by_name.get(name).cloned()
    }

    pub fn get_by_dimension(&self, dimension: &str) -> Vec<Arc<dyn Agent>> {
        self.agents_by_dimension
            .get(dimension)
            .map(|arcs| arcs.to_vec())
            .unwrap_or_default()
    }

    /// Registration order, which is the invocation order within a run.
    pub fn get_all(&self) -> Vec<Arc<dyn Agent>> {
        self.agents.to_vec()
    }

    pub fn count(&self) -> usize {
        self.agents.len()
    }
}
