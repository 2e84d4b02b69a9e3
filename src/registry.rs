//! Static catalogs: module contexts, dashboard tools, smart suggestions
//!
//! Pure lookup tables built once at startup. No mutation, no failure modes
//! beyond "not found".

use serde::{Deserialize, Serialize};

/// A named conversation domain tied to one area of the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleContext {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub route: String,
    pub description: String,
    pub capabilities: Vec<String>,
    pub sample_questions: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    Calculator,
    Analyzer,
    Planner,
    Advisor,
    Utility,
}

/// An embedded tool the assistant can open on the user's behalf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardTool {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub description: String,
    pub category: ToolCategory,
    pub is_available: bool,
}

/// Ordered catalog of module contexts with route and id lookup.
pub struct ContextRegistry {
    contexts: Vec<ModuleContext>,
}

impl ContextRegistry {
    pub fn new(contexts: Vec<ModuleContext>) -> Self {
        Self { contexts }
    }

    pub fn lookup_by_route(&self, path: &str) -> Option<&ModuleContext> {
        self.contexts.iter().find(|ctx| ctx.route == path)
    }

    pub fn lookup_by_id(&self, id: &str) -> Option<&ModuleContext> {
        self.contexts.iter().find(|ctx| ctx.id == id)
    }

    pub fn all(&self) -> &[ModuleContext] {
        &self.contexts
    }

    /// First context in catalog order; the default active topic.
    pub fn default_context(&self) -> &ModuleContext {
        &self.contexts[0]
    }
}

impl Default for ContextRegistry {
    fn default() -> Self {
        Self::new(default_module_contexts())
    }
}

/// Static tool catalog consulted by the action executor and reply tagging.
pub struct ToolCatalog {
    tools: Vec<DashboardTool>,
}

impl ToolCatalog {
    pub fn new(tools: Vec<DashboardTool>) -> Self {
        Self { tools }
    }

    pub fn get(&self, id: &str) -> Option<&DashboardTool> {
        self.tools.iter().find(|t| t.id == id)
    }

    pub fn available(&self) -> impl Iterator<Item = &DashboardTool> {
        self.tools.iter().filter(|t| t.is_available)
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new(default_tools())
    }
}

fn context(
    id: &str,
    name: &str,
    icon: &str,
    route: &str,
    description: &str,
    capabilities: &[&str],
    sample_questions: &[&str],
) -> ModuleContext {
    ModuleContext {
        id: id.to_string(),
        name: name.to_string(),
        icon: icon.to_string(),
        route: route.to_string(),
        description: description.to_string(),
        capabilities: capabilities.iter().map(|s| s.to_string()).collect(),
        sample_questions: sample_questions.iter().map(|s| s.to_string()).collect(),
    }
}

/// The dashboard's conversation topics, in display order.
pub fn default_module_contexts() -> Vec<ModuleContext> {
    vec![
        context(
            "economic-forecasting",
            "Economic Forecasting",
            "TrendingUp",
            "/",
            "Economic indicators, forecasts, and market analysis",
            &[
                "Explain economic indicators and trends",
                "Interpret forecast data and projections",
                "Analyze market conditions and volatility",
                "Provide context for economic events",
            ],
            &[
                "What does this inflation trend indicate?",
                "Explain the GDP forecast for next quarter",
                "What factors are driving this market volatility?",
            ],
        ),
        context(
            "business-forecast",
            "Business Forecast",
            "BarChart3",
            "/business-forecast",
            "Business performance predictions and scenarios",
            &[
                "Analyze business forecast models",
                "Explain scenario planning results",
                "Interpret revenue and cost projections",
                "Provide strategic recommendations",
            ],
            &[
                "How accurate is this forecast model?",
                "What assumptions drive these projections?",
                "How should I adjust my strategy based on this forecast?",
            ],
        ),
        context(
            "tax-compliance",
            "Tax & Compliance",
            "Activity",
            "/tax-compliance",
            "Tax obligations and regulatory compliance",
            &[
                "Explain tax calculations and obligations",
                "Interpret compliance requirements",
                "Analyze audit findings and recommendations",
                "Provide deadline and penalty information",
            ],
            &[
                "What does this tax calculation mean?",
                "How can I improve my compliance score?",
                "What are the implications of this audit finding?",
            ],
        ),
        context(
            "pricing-strategy",
            "Pricing Strategy",
            "TrendingUp",
            "/pricing-strategy",
            "Pricing models and competitive analysis",
            &[
                "Analyze pricing strategies and models",
                "Explain competitive positioning",
                "Interpret price elasticity data",
                "Provide optimization recommendations",
            ],
            &[
                "Is my current pricing optimal?",
                "How do I compare to competitors?",
                "What's the impact of a price change?",
            ],
        ),
        context(
            "revenue-strategy",
            "Revenue Strategy",
            "Activity",
            "/revenue-strategy",
            "Revenue optimization and growth strategies",
            &[
                "Analyze revenue streams and performance",
                "Explain growth drivers and constraints",
                "Interpret customer metrics and LTV",
                "Provide revenue optimization strategies",
            ],
            &[
                "Which revenue stream is most profitable?",
                "How can I increase customer lifetime value?",
                "What's driving the revenue decline?",
            ],
        ),
        context(
            "market-analysis",
            "Market Analysis",
            "BarChart3",
            "/market-competitive-analysis",
            "Market research and competitive intelligence",
            &[
                "Analyze market trends and opportunities",
                "Explain competitive dynamics",
                "Interpret customer behavior data",
                "Provide market entry strategies",
            ],
            &[
                "What's the market opportunity size?",
                "Who are my main competitors?",
                "How is customer behavior changing?",
            ],
        ),
        context(
            "loan-funding",
            "Loan & Funding",
            "TrendingUp",
            "/loan-funding",
            "Financing options and investment analysis",
            &[
                "Analyze loan terms and conditions",
                "Explain funding options and requirements",
                "Interpret financial ratios and metrics",
                "Provide financing recommendations",
            ],
            &[
                "Which loan option is best for me?",
                "What do these financial ratios mean?",
                "How can I improve my creditworthiness?",
            ],
        ),
        context(
            "inventory-supply",
            "Inventory & Supply",
            "BarChart3",
            "/inventory-supply-chain",
            "Supply chain optimization and inventory management",
            &[
                "Analyze inventory levels and turnover",
                "Explain supply chain bottlenecks",
                "Interpret supplier performance data",
                "Provide optimization strategies",
            ],
            &[
                "Why is my inventory turnover low?",
                "Which suppliers are underperforming?",
                "How can I optimize my supply chain?",
            ],
        ),
        context(
            "financial-advisory",
            "Financial Advisory",
            "Calculator",
            "/financial-advisory",
            "Financial planning and strategic budgeting",
            &[
                "Analyze budget forecasts and variances",
                "Explain cash flow projections",
                "Interpret risk assessments",
                "Provide financial planning advice",
            ],
            &[
                "Is my budget realistic?",
                "What does this cash flow projection show?",
                "How can I reduce financial risk?",
            ],
        ),
        context(
            "policy-economic",
            "Policy & Economic",
            "Globe",
            "/policy-economic-analysis",
            "Policy analysis and economic impact assessment",
            &[
                "Explain policy implications and compliance",
                "Analyze economic indicators and trends",
                "Interpret impact assessments",
                "Provide strategic recommendations",
            ],
            &[
                "How does this policy affect my business?",
                "What do these economic indicators mean?",
                "How should I respond to these changes?",
            ],
        ),
        context(
            "business-feasibility",
            "Business Feasibility",
            "CheckCircle",
            "/business-feasibility",
            "Helps decide if a business idea is viable",
            &[
                "Assess risk and viability",
                "Incorporate time value and interest",
                "Estimate ROI timing and feasibility",
                "Compare conservative, safe, and wild modes",
            ],
            &[
                "Is this idea feasible under conservative assumptions?",
                "How does interest rate change affect feasibility?",
                "When do we break even under wild mode?",
            ],
        ),
    ]
}

fn tool(
    id: &str,
    name: &str,
    icon: &str,
    description: &str,
    category: ToolCategory,
) -> DashboardTool {
    DashboardTool {
        id: id.to_string(),
        name: name.to_string(),
        icon: icon.to_string(),
        description: description.to_string(),
        category,
        is_available: true,
    }
}

/// The embedded tool catalog, in display order.
pub fn default_tools() -> Vec<DashboardTool> {
    vec![
        tool(
            "economic-calculator",
            "Economic Calculator",
            "Calculator",
            "Calculate IRR, NPV, ROI, Payback Period",
            ToolCategory::Calculator,
        ),
        tool(
            "forecast-wizard",
            "Forecast Wizard",
            "TrendingUp",
            "Time-series projection with interactive charts",
            ToolCategory::Analyzer,
        ),
        tool(
            "budget-planner",
            "Budget Planner",
            "Target",
            "Generate personal and business budgets",
            ToolCategory::Planner,
        ),
        tool(
            "cba-analyzer",
            "CBA Analyzer",
            "Scale",
            "Cost-Benefit analysis decision assistant",
            ToolCategory::Analyzer,
        ),
        tool(
            "trade-advisor",
            "Trade Advisor",
            "Globe",
            "Trade opportunities based on country data",
            ToolCategory::Advisor,
        ),
        tool(
            "jargon-buster",
            "Jargon Buster",
            "BookOpen",
            "Explain economic terms in plain language",
            ToolCategory::Utility,
        ),
        tool(
            "survey-builder",
            "Survey Builder",
            "ClipboardList",
            "Design and analyze surveys and forms",
            ToolCategory::Utility,
        ),
        tool(
            "dashboard-viewer",
            "Dashboard Viewer",
            "Monitor",
            "View uploaded data in charts and tables",
            ToolCategory::Utility,
        ),
    ]
}

/// Canned prompt suggestions surfaced by the assistant UI.
pub const SMART_SUGGESTIONS: &[&str] = &[
    "Explain this chart to me",
    "What does this trend indicate?",
    "How can I improve these metrics?",
    "Run a cost-benefit analysis",
    "Show me the forecast",
    "What are the key insights here?",
    "How does this compare to benchmarks?",
    "What actions should I take?",
    "Explain this in simple terms",
    "Generate a summary report",
];
